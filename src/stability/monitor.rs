use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::error::Result;
use super::event::StabilityEvent;
use super::health::{is_stable, HealthPolicy, StatusReport};
use super::hooks::HookUsageRecord;
use super::layout::{LayoutRecord, Rect};
use super::metrics::{MetricsPatch, ModuleMetrics};
use super::state::{reduce, StabilityState};
use super::GlobalHealth;

/// The process-wide stability monitor.
///
/// An explicit, constructor-injected service object: whoever assembles the
/// application creates one and passes it (cheaply cloned) to reporters and
/// consumers. There are no module-level singletons.
///
/// Every mutating call funnels through [`dispatch`](Self::dispatch): the
/// event is validated and folded into a fresh snapshot under a single mutex,
/// then the new `Arc<StabilityState>` is published through a watch channel.
/// Reads clone the current `Arc` under the same brief lock and operate
/// lock-free afterwards.
#[derive(Debug, Clone)]
pub struct StabilityMonitor {
    inner: Arc<MonitorInner>,
}

#[derive(Debug)]
struct MonitorInner {
    policy: HealthPolicy,
    current: Mutex<Arc<StabilityState>>,
    publisher: watch::Sender<Arc<StabilityState>>,
}

impl StabilityMonitor {
    pub fn new(policy: HealthPolicy) -> Self {
        let initial = Arc::new(StabilityState::new(Utc::now()));
        let (publisher, _) = watch::channel(Arc::clone(&initial));
        Self {
            inner: Arc::new(MonitorInner {
                policy,
                current: Mutex::new(initial),
                publisher,
            }),
        }
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.inner.policy
    }

    /// Validate, reduce, and publish one event. Returns the validation error
    /// when the event is rejected; the previous state is retained in that
    /// case. The fire-and-forget reporters below swallow this error after
    /// logging it.
    pub fn dispatch(&self, event: StabilityEvent) -> Result<()> {
        // Lock poisoning is absorbed so a panicked reader cannot take the
        // monitor down with it.
        let mut current = self
            .inner
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = Arc::new(reduce(&current, &event, &self.inner.policy, Utc::now())?);
        *current = Arc::clone(&next);
        // Send only fails with zero receivers, which is fine: the mutex copy
        // above is the source of truth for polling readers.
        let _ = self.inner.publisher.send(next);
        debug!(event = event.kind(), "stability event applied");
        Ok(())
    }

    fn report(&self, event: StabilityEvent) {
        if let Err(e) = self.dispatch(event) {
            warn!("stability report ignored: {e}");
        }
    }

    /// Current snapshot; consecutive calls with no intervening report return
    /// the same `Arc`.
    pub fn snapshot(&self) -> Arc<StabilityState> {
        let current = self
            .inner
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&current)
    }

    /// Subscribe to snapshot updates. A receiver that only polls sees the
    /// latest snapshot; an awaiting receiver is woken once per accepted event.
    pub fn subscribe(&self) -> watch::Receiver<Arc<StabilityState>> {
        self.inner.publisher.subscribe()
    }

    // --- reporters (fire and forget) ---

    /// Merge a partial metrics report for a module.
    pub fn report_module_event(&self, module_id: impl Into<String>, patch: MetricsPatch) {
        self.report(StabilityEvent::ModulePatched {
            module_id: module_id.into(),
            patch,
        });
    }

    pub fn record_render(&self, module_id: impl Into<String>) {
        self.report(StabilityEvent::RenderRecorded {
            module_id: module_id.into(),
        });
    }

    pub fn record_error(&self, module_id: impl Into<String>, message: impl Into<String>) {
        self.report(StabilityEvent::ErrorRecorded {
            module_id: module_id.into(),
            message: message.into(),
        });
    }

    pub fn record_recovery(&self, module_id: impl Into<String>) {
        self.report(StabilityEvent::RecoveryRecorded {
            module_id: module_id.into(),
        });
    }

    pub fn record_crash(&self, module_id: impl Into<String>, message: Option<String>) {
        self.report(StabilityEvent::CrashRecorded {
            module_id: module_id.into(),
            message,
        });
    }

    /// Explicit registration call made at the top of a shared-state
    /// accessor's implementation, carrying its stable logical name.
    pub fn report_hook_usage(
        &self,
        hook_name: impl Into<String>,
        module_id: impl Into<String>,
        source: Option<String>,
    ) {
        self.report(StabilityEvent::HookUsed {
            hook_name: hook_name.into(),
            module_id: module_id.into(),
            source,
        });
    }

    pub fn report_layout(&self, element_id: impl Into<String>, rect: Rect) {
        self.report(StabilityEvent::LayoutMeasured {
            element_id: element_id.into(),
            rect,
        });
    }

    pub fn add_alert(&self, message: impl Into<String>) {
        self.report(StabilityEvent::AlertRaised {
            message: message.into(),
        });
    }

    /// Empty the alert log and detection history. Sticky `is_duplicate` and
    /// `has_shift` flags on the underlying records are left untouched; the
    /// detected conditions remain until new reports overwrite them.
    pub fn clear_alerts(&self) {
        self.report(StabilityEvent::AlertsCleared);
    }

    // --- readers ---

    pub fn module_health(&self, module_id: &str) -> Option<ModuleMetrics> {
        self.snapshot().module(module_id).cloned()
    }

    pub fn duplicate_hooks(&self) -> Vec<HookUsageRecord> {
        self.snapshot()
            .duplicate_hooks()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn layout_shifts(&self) -> Vec<LayoutRecord> {
        self.snapshot()
            .layout_shifts()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn global_health(&self) -> GlobalHealth {
        self.snapshot().global_health
    }

    /// Consumer-facing gate combining global health with the count of
    /// warning-status modules against the configured threshold.
    pub fn is_stable(&self) -> bool {
        let snapshot = self.snapshot();
        is_stable(
            snapshot.global_health,
            snapshot.warning_module_count(),
            &self.inner.policy,
        )
    }

    pub fn status_report(&self) -> StatusReport {
        StatusReport::new(&self.snapshot(), &self.inner.policy)
    }
}

impl Default for StabilityMonitor {
    fn default() -> Self {
        Self::new(HealthPolicy::default())
    }
}
