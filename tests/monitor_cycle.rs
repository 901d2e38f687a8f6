use egui::Color32;
use resmon::error::MetricError;
use resmon::metric::{Metric, MetricSet};
use resmon::monitor::Monitor;
use resmon::present::{Presenter, GREEN, PLACEHOLDER, RED, YELLOW};
use resmon::sampler::{BoundedGpu, GpuProbe, GpuSample, HostProbe, Sampler};
use resmon::schedule::ManualClock;
use resmon::settings::{ColorMode, Settings};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const THEME: Color32 = Color32::from_rgb(200, 200, 200);

struct Host {
    cpu: f64,
    ram: f64,
}

impl HostProbe for Host {
    fn cpu_percent(&mut self) -> Result<f64, MetricError> {
        Ok(self.cpu)
    }
    fn ram_percent(&mut self) -> Result<f64, MetricError> {
        Ok(self.ram)
    }
}

/// Sleeps on the calls listed in `slow`, answers `util` otherwise.
struct Gpu {
    util: f64,
    slow: Vec<usize>,
    fail_permanently: bool,
    calls: Arc<AtomicUsize>,
}

impl GpuProbe for Gpu {
    fn query(&mut self) -> Result<GpuSample, MetricError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_permanently {
            return Err(MetricError::unsupported(Metric::Gpu, "device lost"));
        }
        if self.slow.contains(&n) {
            thread::sleep(Duration::from_millis(200));
        }
        Ok(GpuSample { utilization: self.util, temp_celsius: Some(61.0) })
    }
}

fn gpu(util: f64, slow: Vec<usize>, fail_permanently: bool) -> (BoundedGpu, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();
    let g = BoundedGpu::spawn(
        move || Ok(Box::new(Gpu { util, slow, fail_permanently, calls: c }) as Box<dyn GpuProbe>),
        Duration::from_secs(2),
        Duration::from_millis(30),
    )
    .unwrap();
    (g, calls)
}

fn settings(metrics: &[Metric]) -> Settings {
    Settings {
        enabled_metrics: MetricSet::from_ordered(metrics.iter().copied()),
        update_interval_seconds: 1,
        color_mode: ColorMode::Dynamic,
        ..Settings::default()
    }
}

fn lines<C: resmon::schedule::Clock, H: HostProbe>(m: &Monitor<C, H>) -> Vec<(&'static str, String, Color32)> {
    m.display().lines.iter().map(|l| (l.label, l.value_text.clone(), l.color)).collect()
}

#[test]
fn test_cpu_ram_dynamic_tick() {
    let clock = ManualClock::new();
    let sampler = Sampler::new(Host { cpu: 73.0, ram: 40.0 }, Err(MetricError::unsupported(Metric::Gpu, "none")));
    let mut m = Monitor::new(clock.clone(), sampler, Presenter::new(THEME));
    let s = settings(&[Metric::Cpu, Metric::Ram]);

    assert!(m.pump(&s));
    assert_eq!(lines(&m), vec![("CPU", "73%".to_string(), YELLOW), ("RAM", "40%".to_string(), GREEN)]);
}

#[test]
fn test_gpu_timeout_then_recovery() {
    let clock = ManualClock::new();
    let (g, calls) = gpu(85.0, vec![0], false);
    let sampler = Sampler::new(Host { cpu: 10.0, ram: 10.0 }, Ok(g));
    let mut m = Monitor::new(clock.clone(), sampler, Presenter::new(THEME));
    let s = settings(&[Metric::Cpu, Metric::Gpu, Metric::Ram]);

    assert!(m.pump(&s));
    assert_eq!(lines(&m)[1], ("GPU", PLACEHOLDER.to_string(), THEME));
    assert_eq!(m.display().lines.len(), 3);

    // let the stalled query finish before the next tick
    thread::sleep(Duration::from_millis(400));
    clock.advance(Duration::from_secs(1));
    assert!(m.pump(&s));
    assert_eq!(lines(&m)[1], ("GPU", "85%".to_string(), RED));
    assert_eq!(m.last_reading().and_then(|r| r.gpu_temp_celsius), Some(61.0));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unsupported_gpu_stays_disabled() {
    let clock = ManualClock::new();
    let (g, calls) = gpu(0.0, vec![], true);
    let sampler = Sampler::new(Host { cpu: 10.0, ram: 10.0 }, Ok(g));
    let mut m = Monitor::new(clock.clone(), sampler, Presenter::new(THEME));
    let s = settings(&[Metric::Gpu]);

    for _ in 0..4 {
        assert!(m.pump(&s));
        assert_eq!(lines(&m), vec![("GPU", PLACEHOLDER.to_string(), THEME)]);
        clock.advance(Duration::from_secs(1));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_interval_change_applies_from_next_schedule() {
    let clock = ManualClock::new();
    let sampler = Sampler::new(Host { cpu: 1.0, ram: 1.0 }, Err(MetricError::unsupported(Metric::Gpu, "none")));
    let mut m = Monitor::new(clock.clone(), sampler, Presenter::new(THEME));
    let mut s = settings(&[Metric::Cpu]);

    assert!(m.pump(&s));
    s.update_interval_seconds = 5;
    // still due at +1 s, which then schedules +5 s
    clock.advance(Duration::from_secs(1));
    assert!(m.pump(&s));
    clock.advance(Duration::from_secs(4));
    assert!(!m.pump(&s));
    clock.advance(Duration::from_secs(1));
    assert!(m.pump(&s));
    assert_eq!(m.ticks(), 3);
}
