use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::error::{Result, StabilityError};
use super::metrics::MetricsPatch;
use super::monitor::StabilityMonitor;

/// One probe measurement: how long the executor took to schedule us, plus
/// process resource readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeReading {
    /// Yield round-trip through the executor, in milliseconds. Used as the
    /// sampled module's load time.
    pub sched_latency_ms: f64,
    pub process_memory_bytes: u64,
    pub cpu_usage_percent: f32,
}

/// Seam for the sampler's measurement source, mockable in tests.
#[async_trait]
pub trait RuntimeProbe: Send + Sync + std::fmt::Debug {
    async fn measure(&self) -> Result<ProbeReading>;
}

/// Probe backed by the running process: scheduling latency via a timed yield,
/// memory and CPU via sysinfo.
#[derive(Debug)]
pub struct SystemProbe {
    system: Mutex<sysinfo::System>,
    pid: sysinfo::Pid,
}

impl SystemProbe {
    pub fn new() -> Result<Self> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| StabilityError::Probe { reason: e.to_string() })?;
        Ok(Self {
            system: Mutex::new(sysinfo::System::new()),
            pid,
        })
    }
}

#[async_trait]
impl RuntimeProbe for SystemProbe {
    async fn measure(&self) -> Result<ProbeReading> {
        let start = Instant::now();
        tokio::task::yield_now().await;
        let sched_latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut system = self
            .system
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        system.refresh_process(self.pid);
        let process = system.process(self.pid).ok_or_else(|| StabilityError::Probe {
            reason: format!("process {} not visible to sysinfo", self.pid),
        })?;

        Ok(ProbeReading {
            sched_latency_ms,
            process_memory_bytes: process.memory(),
            cpu_usage_percent: process.cpu_usage(),
        })
    }
}

/// Settings for the background sampler task.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Seconds between probe measurements.
    pub interval_seconds: u64,
    /// Module id the readings are reported under.
    pub module_id: String,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 30,
            module_id: "runtime".to_string(),
        }
    }
}

/// Background task that periodically probes the runtime and feeds the
/// readings into the monitor exactly like any other reporter.
///
/// Probe failures never escape the task: they are surfaced as a protection
/// alert and tracked as an error against the sampler's own module.
pub struct PerformanceSampler {
    config: SamplerConfig,
    shutdown_tx: Option<broadcast::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl PerformanceSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            config,
            shutdown_tx: None,
            handle: None,
        }
    }

    /// Spawn the sampling loop. The first measurement is delayed by a random
    /// jitter of up to one interval so multiple samplers started together do
    /// not probe in lockstep.
    pub fn start(&mut self, monitor: StabilityMonitor, probe: Box<dyn RuntimeProbe>) {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        self.shutdown_tx = Some(shutdown_tx);

        let config = self.config.clone();
        let handle = tokio::spawn(async move {
            let interval = Duration::from_secs(config.interval_seconds.max(1));
            let jitter = rand::thread_rng().gen_range(Duration::ZERO..interval);
            info!(
                module_id = %config.module_id,
                interval_secs = config.interval_seconds,
                "performance sampler started"
            );
            tokio::select! {
                _ = tokio::time::sleep(jitter) => {}
                _ = shutdown_rx.recv() => return,
            }

            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        sample_once(&monitor, probe.as_ref(), &config.module_id).await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!(module_id = %config.module_id, "performance sampler stopping");
                        return;
                    }
                }
            }
        });
        self.handle = Some(handle);
    }

    /// Signal the loop to stop and wait for it to wind down.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("sampler task did not shut down cleanly: {e}");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

async fn sample_once(monitor: &StabilityMonitor, probe: &dyn RuntimeProbe, module_id: &str) {
    match probe.measure().await {
        Ok(reading) => {
            debug!(
                module_id,
                latency_ms = reading.sched_latency_ms,
                memory_bytes = reading.process_memory_bytes,
                cpu_percent = reading.cpu_usage_percent,
                "runtime probe sample"
            );
            monitor.report_module_event(
                module_id,
                MetricsPatch {
                    load_time_ms: Some(reading.sched_latency_ms),
                    ..Default::default()
                },
            );
        }
        Err(e) => {
            warn!(module_id, "runtime probe failed: {e}");
            monitor.add_alert(format!("Runtime probe failed: {e}"));
            monitor.record_error(module_id, e.to_string());
        }
    }
}
