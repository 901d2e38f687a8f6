use sysinfo::{CpuExt, CpuRefreshKind, RefreshKind, System, SystemExt};

use super::HostProbe;
use crate::error::MetricError;
use crate::metric::Metric;

/// CPU and RAM through `sysinfo`. Refreshes only what it reads and never sleeps.
pub struct SysinfoHost {
    sys: System,
}

impl SysinfoHost {
    pub fn new() -> Self {
        let mut sys = System::new_with_specifics(
            RefreshKind::new().with_cpu(CpuRefreshKind::new().with_cpu_usage()).with_memory(),
        );
        // CPU usage is a delta; prime the first measurement.
        sys.refresh_cpu();
        Self { sys }
    }
}

impl Default for SysinfoHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe for SysinfoHost {
    fn cpu_percent(&mut self) -> Result<f64, MetricError> {
        self.sys.refresh_cpu();
        let cpus = self.sys.cpus();
        if cpus.is_empty() {
            return Err(MetricError::unavailable(Metric::Cpu, "no CPUs reported"));
        }
        Ok(cpus.iter().map(|c| c.cpu_usage() as f64).sum::<f64>() / (cpus.len() as f64))
    }

    fn ram_percent(&mut self) -> Result<f64, MetricError> {
        self.sys.refresh_memory();
        let total_mem = self.sys.total_memory() as f64;
        if total_mem <= 0.0 {
            return Err(MetricError::unavailable(Metric::Ram, "total memory reported as zero"));
        }
        let used_mem = (self.sys.used_memory() as f64).min(total_mem);
        Ok((used_mem / total_mem) * 100.0)
    }
}
