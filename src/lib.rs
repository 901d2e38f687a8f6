// Resource Monitor - core library

pub mod app;
pub mod autostart;
pub mod error;
pub mod metric;
pub mod monitor;
pub mod present;
pub mod sampler;
pub mod schedule;
pub mod settings;

pub use error::{AutostartError, MetricError, SettingsError};
pub use metric::{Metric, MetricSet, Reading};
pub use monitor::Monitor;
pub use present::{DisplayLine, DisplayState, Presenter};
pub use sampler::{HostProbe, Sampler};
pub use settings::{ColorMode, Settings, SettingsStore};

// Initialize logging
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
