use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::MetricError;
use crate::metric::Metric;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GpuSample {
    pub utilization: f64,
    pub temp_celsius: Option<f64>,
}

pub trait GpuProbe {
    fn query(&mut self) -> Result<GpuSample, MetricError>;
}

type Reply = (u64, Result<GpuSample, MetricError>);

// ===================== Bounded worker =====================
/// Probe owned by a worker thread. One request at a time, late replies dropped.
pub struct BoundedGpu {
    requests: Sender<u64>,
    replies: Receiver<Reply>,
    timeout: Duration,
    next_seq: u64,
    outstanding: Option<u64>,
}

impl BoundedGpu {
    /// Starts the worker and runs `init` on it. Fails with `Unsupported` when
    /// `init` fails or does not finish within `init_timeout`.
    pub fn spawn<F>(init: F, init_timeout: Duration, timeout: Duration) -> Result<Self, MetricError>
    where
        F: FnOnce() -> Result<Box<dyn GpuProbe>, MetricError> + Send + 'static,
    {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), MetricError>>();
        let (req_tx, req_rx) = mpsc::channel::<u64>();
        let (reply_tx, reply_rx) = mpsc::channel::<Reply>();

        thread::Builder::new()
            .name("gpu-probe".into())
            .spawn(move || {
                let mut probe = match init() {
                    Ok(p) => {
                        let _ = ready_tx.send(Ok(()));
                        p
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Exits once the sampler drops its request sender.
                for seq in req_rx {
                    if reply_tx.send((seq, probe.query())).is_err() {
                        break;
                    }
                }
                log::debug!("gpu probe worker exiting");
            })
            .map_err(|e| MetricError::unsupported(Metric::Gpu, format!("could not start worker: {e}")))?;

        match ready_rx.recv_timeout(init_timeout) {
            Ok(Ok(())) => Ok(Self { requests: req_tx, replies: reply_rx, timeout, next_seq: 0, outstanding: None }),
            Ok(Err(e)) => Err(MetricError::unsupported(Metric::Gpu, reason_of(&e))),
            Err(RecvTimeoutError::Timeout) => Err(MetricError::unsupported(Metric::Gpu, "probe did not initialise in time")),
            Err(RecvTimeoutError::Disconnected) => Err(MetricError::unsupported(Metric::Gpu, "probe worker died during init")),
        }
    }

    pub fn query(&mut self) -> Result<GpuSample, MetricError> {
        if let Some(pending) = self.outstanding {
            loop {
                match self.replies.try_recv() {
                    Ok((seq, _)) if seq == pending => {
                        log::debug!("discarded late GPU reply #{seq}");
                        self.outstanding = None;
                        break;
                    }
                    Ok(_) => continue,
                    Err(TryRecvError::Empty) => {
                        return Err(MetricError::unavailable(Metric::Gpu, "previous query still running"))
                    }
                    Err(TryRecvError::Disconnected) => return Err(worker_gone()),
                }
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.requests.send(seq).map_err(|_| worker_gone())?;

        let deadline = Instant::now() + self.timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.replies.recv_timeout(left) {
                Ok((s, result)) if s == seq => return result,
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => {
                    self.outstanding = Some(seq);
                    return Err(MetricError::unavailable(Metric::Gpu, format!("query timed out after {:?}", self.timeout)));
                }
                Err(RecvTimeoutError::Disconnected) => return Err(worker_gone()),
            }
        }
    }
}

fn worker_gone() -> MetricError {
    MetricError::unsupported(Metric::Gpu, "probe worker exited")
}

fn reason_of(e: &MetricError) -> String {
    match e {
        MetricError::Unavailable(_, r) | MetricError::Unsupported(_, r) => r.clone(),
    }
}

/// The probe for this build: NVML when the `nvidia` feature is on.
pub fn detect(init_timeout: Duration, timeout: Duration) -> Result<BoundedGpu, MetricError> {
    #[cfg(feature = "nvidia")]
    {
        BoundedGpu::spawn(
            || super::nvgpu::NvmlProbe::try_new().map(|p| Box::new(p) as Box<dyn GpuProbe>),
            init_timeout,
            timeout,
        )
    }
    #[cfg(not(feature = "nvidia"))]
    {
        let _ = (init_timeout, timeout);
        Err(MetricError::unsupported(Metric::Gpu, "built without NVIDIA support"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Scripted probe: per call, an optional delay and a result.
    pub(crate) struct ScriptedGpu {
        pub script: Vec<(Duration, Result<GpuSample, MetricError>)>,
        pub calls: Arc<AtomicUsize>,
    }

    impl GpuProbe for ScriptedGpu {
        fn query(&mut self) -> Result<GpuSample, MetricError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let (delay, result) = self.script.get(n).or(self.script.last()).cloned().expect("empty script");
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            result
        }
    }

    pub(crate) fn sample(util: f64) -> Result<GpuSample, MetricError> {
        Ok(GpuSample { utilization: util, temp_celsius: Some(55.0) })
    }

    pub(crate) fn scripted(
        script: Vec<(Duration, Result<GpuSample, MetricError>)>,
        timeout: Duration,
    ) -> (BoundedGpu, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let gpu = BoundedGpu::spawn(
            move || Ok(Box::new(ScriptedGpu { script, calls: c }) as Box<dyn GpuProbe>),
            Duration::from_secs(2),
            timeout,
        )
        .expect("scripted probe starts");
        (gpu, calls)
    }

    #[test]
    fn answers_within_timeout() {
        let (mut gpu, _) = scripted(vec![(Duration::ZERO, sample(37.0))], Duration::from_secs(2));
        assert_eq!(gpu.query().unwrap().utilization, 37.0);
        assert_eq!(gpu.query().unwrap().utilization, 37.0);
    }

    #[test]
    fn timeout_is_transient_and_late_reply_is_discarded() {
        let (mut gpu, calls) = scripted(
            vec![(Duration::from_millis(150), sample(99.0)), (Duration::ZERO, sample(12.0))],
            Duration::from_millis(20),
        );
        let err = gpu.query().unwrap_err();
        assert!(!err.is_permanent());
        thread::sleep(Duration::from_millis(400));
        assert_eq!(gpu.query().unwrap().utilization, 12.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn no_new_request_while_previous_runs() {
        let (mut gpu, calls) = scripted(vec![(Duration::from_millis(300), sample(1.0))], Duration::from_millis(10));
        assert!(gpu.query().is_err());
        assert!(gpu.query().is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_init_is_unsupported() {
        let r = BoundedGpu::spawn(
            || Err(MetricError::unavailable(Metric::Gpu, "no device")),
            Duration::from_secs(1),
            Duration::from_millis(10),
        );
        assert_eq!(r.err(), Some(MetricError::unsupported(Metric::Gpu, "no device")));
    }

    #[test]
    fn slow_init_is_unsupported() {
        let r = BoundedGpu::spawn(
            || {
                thread::sleep(Duration::from_millis(200));
                Ok(Box::new(ScriptedGpu { script: vec![(Duration::ZERO, sample(1.0))], calls: Arc::default() })
                    as Box<dyn GpuProbe>)
            },
            Duration::from_millis(10),
            Duration::from_millis(10),
        );
        assert!(r.err().map(|e| e.is_permanent()).unwrap_or(false));
    }
}
