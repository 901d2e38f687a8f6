use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::metric::Metric;

/// Failure while sampling a single metric.
///
/// `Unavailable` is transient: the metric is absent for this tick only.
/// `Unsupported` is permanent: the sampler stops querying that source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error("{0} unavailable: {1}")]
    Unavailable(Metric, String),

    #[error("{0} unsupported: {1}")]
    Unsupported(Metric, String),
}

impl MetricError {
    pub fn unavailable<S: Into<String>>(metric: Metric, reason: S) -> Self {
        MetricError::Unavailable(metric, reason.into())
    }

    pub fn unsupported<S: Into<String>>(metric: Metric, reason: S) -> Self {
        MetricError::Unsupported(metric, reason.into())
    }

    pub fn metric(&self) -> Metric {
        match self {
            MetricError::Unavailable(m, _) | MetricError::Unsupported(m, _) => *m,
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, MetricError::Unsupported(..))
    }
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("could not determine the settings directory")]
    NoConfigDir,

    #[error("no settings file at {path:?}")]
    Missing { path: PathBuf },

    #[error("failed to load settings from {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("failed to save settings to {path:?}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SettingsError {
    pub fn is_missing_file(&self) -> bool {
        matches!(self, SettingsError::Missing { .. })
    }
}

#[derive(Error, Debug)]
pub enum AutostartError {
    #[error("autostart is not supported on this platform")]
    Unsupported,

    #[error("could not resolve the executable path: {0}")]
    ExePath(#[source] io::Error),

    #[error("registry error: {0}")]
    Registry(#[source] io::Error),
}
