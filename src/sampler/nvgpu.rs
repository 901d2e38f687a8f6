// ===================== NVIDIA support =====================
use nvml_wrapper::{enum_wrappers::device::TemperatureSensor, error::NvmlError, Nvml};

use super::gpu::{GpuProbe, GpuSample};
use crate::error::MetricError;
use crate::metric::Metric;

pub struct NvmlProbe {
    nvml: Nvml,
    device_index: u32,
}

impl NvmlProbe {
    /// Loads NVML and checks that device 0 answers. Any failure is permanent.
    pub fn try_new() -> Result<Self, MetricError> {
        let nvml = Nvml::init().map_err(|e| MetricError::unsupported(Metric::Gpu, format!("NVML init failed: {e}")))?;
        let count = nvml.device_count().map_err(|e| MetricError::unsupported(Metric::Gpu, e.to_string()))?;
        if count == 0 {
            return Err(MetricError::unsupported(Metric::Gpu, "no NVIDIA device found"));
        }
        let idx = 0u32;
        {
            let dev = nvml.device_by_index(idx).map_err(|e| MetricError::unsupported(Metric::Gpu, e.to_string()))?; // probe
            if let Ok(name) = dev.name() {
                log::info!("GPU sampling via NVML on {name}");
            }
        }
        Ok(Self { nvml, device_index: idx })
    }
}

impl GpuProbe for NvmlProbe {
    fn query(&mut self) -> Result<GpuSample, MetricError> {
        let dev = self.nvml.device_by_index(self.device_index).map_err(classify)?;
        let util = dev.utilization_rates().map_err(classify)?; // gpu, mem (% u32)
        let temp = dev.temperature(TemperatureSensor::Gpu).ok().map(f64::from); // °C
        Ok(GpuSample { utilization: f64::from(util.gpu), temp_celsius: temp })
    }
}

fn classify(e: NvmlError) -> MetricError {
    match e {
        NvmlError::NotSupported | NvmlError::GpuLost | NvmlError::Uninitialized | NvmlError::DriverNotLoaded => {
            MetricError::unsupported(Metric::Gpu, e.to_string())
        }
        other => MetricError::unavailable(Metric::Gpu, other.to_string()),
    }
}
