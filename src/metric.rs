use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "CPU")]
    Cpu,
    #[serde(rename = "RAM")]
    Ram,
    #[serde(rename = "GPU")]
    Gpu,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Cpu, Metric::Gpu, Metric::Ram];

    pub fn label(self) -> &'static str {
        match self {
            Metric::Cpu => "CPU",
            Metric::Ram => "RAM",
            Metric::Gpu => "GPU",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered, duplicate-free set of enabled metrics. Order is display order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MetricSet(Vec<Metric>);

impl MetricSet {
    pub fn empty() -> Self {
        MetricSet(Vec::new())
    }

    /// Builds a set keeping the first occurrence of each metric.
    pub fn from_ordered<I: IntoIterator<Item = Metric>>(metrics: I) -> Self {
        let mut out = Vec::with_capacity(Metric::ALL.len());
        for m in metrics {
            if !out.contains(&m) {
                out.push(m);
            }
        }
        MetricSet(out)
    }

    pub fn contains(&self, metric: Metric) -> bool {
        self.0.contains(&metric)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Metric> + '_ {
        self.0.iter().copied()
    }

    /// Enables `metric` at its default position relative to the metrics already shown.
    pub fn insert(&mut self, metric: Metric) {
        if self.contains(metric) {
            return;
        }
        let rank = |m: Metric| Metric::ALL.iter().position(|x| *x == m).unwrap_or(usize::MAX);
        let at = self.0.iter().position(|m| rank(*m) > rank(metric)).unwrap_or(self.0.len());
        self.0.insert(at, metric);
    }

    pub fn remove(&mut self, metric: Metric) {
        self.0.retain(|m| *m != metric);
    }

    pub fn toggle(&mut self, metric: Metric) {
        if self.contains(metric) {
            self.remove(metric)
        } else {
            self.insert(metric)
        }
    }
}

impl Default for MetricSet {
    fn default() -> Self {
        MetricSet(Metric::ALL.to_vec())
    }
}

impl<'de> Deserialize<'de> for MetricSet {
    fn deserialize<D: serde::Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let v = Vec::<Metric>::deserialize(de)?;
        Ok(MetricSet::from_ordered(v))
    }
}

/// One sampled snapshot. Percentages are finite and within [0,100].
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub cpu_percent: Option<f64>,
    pub ram_percent: Option<f64>,
    pub gpu_percent: Option<f64>,
    pub gpu_temp_celsius: Option<f64>,
    pub timestamp: Instant,
}

impl Reading {
    pub fn empty(timestamp: Instant) -> Self {
        Self { cpu_percent: None, ram_percent: None, gpu_percent: None, gpu_temp_celsius: None, timestamp }
    }

    pub fn percent(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Cpu => self.cpu_percent,
            Metric::Ram => self.ram_percent,
            Metric::Gpu => self.gpu_percent,
        }
    }

    pub(crate) fn set_percent(&mut self, metric: Metric, value: Option<f64>) {
        match metric {
            Metric::Cpu => self.cpu_percent = value,
            Metric::Ram => self.ram_percent = value,
            Metric::Gpu => self.gpu_percent = value,
        }
    }
}
