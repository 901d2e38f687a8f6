mod gpu;
mod host;
#[cfg(feature = "nvidia")]
mod nvgpu;

pub use gpu::{detect as detect_gpu, BoundedGpu, GpuProbe, GpuSample};
pub use host::SysinfoHost;

use std::time::{Duration, Instant};

use crate::error::MetricError;
use crate::metric::{Metric, MetricSet, Reading};

pub const GPU_INIT_TIMEOUT: Duration = Duration::from_secs(3);
pub const GPU_QUERY_TIMEOUT: Duration = Duration::from_millis(250);

/// CPU and RAM source. Calls must return without blocking on I/O.
pub trait HostProbe {
    fn cpu_percent(&mut self) -> Result<f64, MetricError>;
    fn ram_percent(&mut self) -> Result<f64, MetricError>;
}

enum GpuChannel {
    Active(BoundedGpu),
    Disabled,
}

// ===================== Sampler =====================
/// Reads each enabled metric on its own. A failure leaves that metric absent
/// for the tick; an `Unsupported` failure switches it off for the session.
pub struct Sampler<H: HostProbe> {
    host: H,
    gpu: GpuChannel,
    disabled: MetricSet,
}

impl<H: HostProbe> Sampler<H> {
    /// `gpu` is the outcome of the startup probe; an error disables GPU sampling.
    pub fn new(host: H, gpu: Result<BoundedGpu, MetricError>) -> Self {
        let mut disabled = MetricSet::empty();
        let gpu = match gpu {
            Ok(g) => GpuChannel::Active(g),
            Err(e) => {
                log::info!("GPU sampling disabled: {e}");
                disabled.insert(Metric::Gpu);
                GpuChannel::Disabled
            }
        };
        Self { host, gpu, disabled }
    }

    pub fn is_enabled(&self, metric: Metric) -> bool {
        !self.disabled.contains(metric)
    }

    pub fn gpu_enabled(&self) -> bool {
        self.is_enabled(Metric::Gpu)
    }

    pub fn sample(&mut self, enabled: &MetricSet, at: Instant) -> Reading {
        let mut reading = Reading::empty(at);
        for metric in enabled.iter() {
            if self.disabled.contains(metric) {
                continue;
            }
            let value = match metric {
                Metric::Cpu => self.host.cpu_percent(),
                Metric::Ram => self.host.ram_percent(),
                Metric::Gpu => self.sample_gpu().map(|s| {
                    reading.gpu_temp_celsius = s.temp_celsius.filter(|t| t.is_finite());
                    s.utilization
                }),
            };
            match value.and_then(|v| normalize(metric, v)) {
                Ok(v) => reading.set_percent(metric, Some(v)),
                Err(e) if e.is_permanent() => self.disable(metric, &e),
                Err(e) => log::warn!("{e}"),
            }
        }
        reading
    }

    fn disable(&mut self, metric: Metric, cause: &MetricError) {
        log::info!("{cause}; {metric} sampling disabled for this session");
        self.disabled.insert(metric);
        if metric == Metric::Gpu {
            // drops the request sender, which ends the worker thread
            self.gpu = GpuChannel::Disabled;
        }
    }

    fn sample_gpu(&mut self) -> Result<GpuSample, MetricError> {
        match &mut self.gpu {
            GpuChannel::Active(gpu) => gpu.query(),
            GpuChannel::Disabled => Err(MetricError::unsupported(Metric::Gpu, "sampling disabled")),
        }
    }
}

fn normalize(metric: Metric, v: f64) -> Result<f64, MetricError> {
    if v.is_finite() {
        Ok(v.clamp(0.0, 100.0))
    } else {
        Err(MetricError::unavailable(metric, format!("non-finite value {v}")))
    }
}
