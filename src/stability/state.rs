use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::Result;
use super::event::StabilityEvent;
use super::health::{derive_global_health, HealthPolicy};
use super::hooks::HookUsageRecord;
use super::layout::LayoutRecord;
use super::metrics::{ModuleHealth, ModuleMetrics};
use super::{Detection, DetectionKind, GlobalHealth, ProtectionAlert, MAX_PROTECTION_ALERTS};

/// One immutable snapshot of everything the trackers know.
///
/// The reducer never mutates a published snapshot: each accepted event clones
/// the previous state, folds the event in, recomputes global health, and the
/// monitor publishes the result as a fresh `Arc`. Readers therefore always
/// see a consistent picture and never a half-applied event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityState {
    pub modules: HashMap<String, ModuleMetrics>,
    pub hooks: HashMap<String, HookUsageRecord>,
    pub layouts: HashMap<String, LayoutRecord>,
    /// Bounded rolling log, most recent `MAX_PROTECTION_ALERTS` entries.
    pub alerts: VecDeque<ProtectionAlert>,
    /// Anomaly history kept for alert purposes only; see `clear_alerts`.
    pub detections: Vec<Detection>,
    pub global_health: GlobalHealth,
    pub updated_at: DateTime<Utc>,
}

impl StabilityState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            modules: HashMap::new(),
            hooks: HashMap::new(),
            layouts: HashMap::new(),
            alerts: VecDeque::new(),
            detections: Vec::new(),
            global_health: GlobalHealth::Stable,
            updated_at: now,
        }
    }

    pub fn module(&self, module_id: &str) -> Option<&ModuleMetrics> {
        self.modules.get(module_id)
    }

    /// Hooks currently flagged as used from more than one module.
    /// Ordering follows map iteration and is unspecified.
    pub fn duplicate_hooks(&self) -> Vec<&HookUsageRecord> {
        self.hooks.values().filter(|h| h.is_duplicate).collect()
    }

    /// Regions currently displaced beyond tolerance from their baseline.
    pub fn layout_shifts(&self) -> Vec<&LayoutRecord> {
        self.layouts.values().filter(|l| l.has_shift).collect()
    }

    pub fn critical_module_count(&self) -> usize {
        self.modules
            .values()
            .filter(|m| m.health == ModuleHealth::Critical)
            .count()
    }

    pub fn warning_module_count(&self) -> usize {
        self.modules
            .values()
            .filter(|m| m.health == ModuleHealth::Warning)
            .count()
    }

    fn push_alert(&mut self, message: String, now: DateTime<Utc>) {
        self.alerts.push_back(ProtectionAlert::new(message, now));
        while self.alerts.len() > MAX_PROTECTION_ALERTS {
            self.alerts.pop_front();
        }
    }

    fn push_detection(&mut self, kind: DetectionKind, now: DateTime<Utc>) {
        let detection = Detection::new(kind, now);
        self.push_alert(detection.describe(), now);
        self.detections.push(detection);
    }

    fn module_entry(&mut self, module_id: &str, now: DateTime<Utc>) -> &mut ModuleMetrics {
        self.modules
            .entry(module_id.to_string())
            .or_insert_with(|| ModuleMetrics::new(module_id, now))
    }

    /// Note a module-health change, raising a detection when the module
    /// crosses into critical.
    fn track_health_transition(
        &mut self,
        module_id: &str,
        before: Option<ModuleHealth>,
        now: DateTime<Utc>,
    ) {
        let after = match self.modules.get(module_id) {
            Some(metrics) => metrics.health,
            None => return,
        };
        if after == ModuleHealth::Critical && before != Some(ModuleHealth::Critical) {
            self.push_detection(
                DetectionKind::ModuleCritical {
                    module_id: module_id.to_string(),
                },
                now,
            );
        }
    }
}

/// Fold one validated event into the state. Pure with respect to its inputs:
/// same state + same event + same clock reading always produce the same
/// output. Returns the fresh state, or a validation error (in which case the
/// caller keeps the previous state).
pub fn reduce(
    state: &StabilityState,
    event: &StabilityEvent,
    policy: &HealthPolicy,
    now: DateTime<Utc>,
) -> Result<StabilityState> {
    event.validate()?;

    let mut next = state.clone();
    match event {
        StabilityEvent::ModulePatched { module_id, patch } => {
            if let Some(existing) = next.modules.get(module_id) {
                patch.ensure_monotonic(existing)?;
            }
            let before = next.modules.get(module_id).map(|m| m.health);
            next.module_entry(module_id, now).apply_patch(patch, now);
            next.track_health_transition(module_id, before, now);
        }
        StabilityEvent::RenderRecorded { module_id } => {
            let metrics = next.module_entry(module_id, now);
            metrics.render_count += 1;
            metrics.recompute_derived(now);
        }
        StabilityEvent::ErrorRecorded { module_id, message } => {
            let before = next.modules.get(module_id).map(|m| m.health);
            let metrics = next.module_entry(module_id, now);
            metrics.error_count += 1;
            metrics.last_error = Some(message.clone());
            metrics.recompute_derived(now);
            next.track_health_transition(module_id, before, now);
        }
        StabilityEvent::RecoveryRecorded { module_id } => {
            let metrics = next.module_entry(module_id, now);
            metrics.recovery_count += 1;
            metrics.recompute_derived(now);
        }
        StabilityEvent::CrashRecorded { module_id, message } => {
            let metrics = next.module_entry(module_id, now);
            metrics.crash_count += 1;
            if let Some(message) = message {
                metrics.last_error = Some(message.clone());
            }
            metrics.recompute_derived(now);
        }
        StabilityEvent::HookUsed {
            hook_name,
            module_id,
            source,
        } => match next.hooks.get_mut(hook_name) {
            Some(record) => {
                let previous_module = record.module_id.clone();
                let flipped = record.record_usage(module_id, source.as_deref(), now);
                if flipped {
                    next.push_detection(
                        DetectionKind::DuplicateHook {
                            hook_name: hook_name.clone(),
                            previous_module,
                            module_id: module_id.clone(),
                            source: source.clone(),
                        },
                        now,
                    );
                }
            }
            None => {
                next.hooks.insert(
                    hook_name.clone(),
                    HookUsageRecord::new(hook_name, module_id, source.clone(), now),
                );
            }
        },
        StabilityEvent::LayoutMeasured { element_id, rect } => {
            match next.layouts.get_mut(element_id) {
                Some(record) => {
                    let flipped = record.observe(*rect, now);
                    if flipped {
                        let shift_amount = record.shift_amount;
                        next.push_detection(
                            DetectionKind::LayoutShift {
                                element_id: element_id.clone(),
                                shift_amount,
                            },
                            now,
                        );
                    }
                }
                None => {
                    next.layouts
                        .insert(element_id.clone(), LayoutRecord::new(element_id, *rect, now));
                }
            }
        }
        StabilityEvent::AlertRaised { message } => {
            next.push_alert(message.clone(), now);
        }
        StabilityEvent::AlertsCleared => {
            // Drops the history only. Sticky duplicate and shift flags on the
            // underlying records survive until new reports overwrite them.
            next.alerts.clear();
            next.detections.clear();
        }
    }

    next.global_health = derive_global_health(
        next.critical_module_count(),
        next.duplicate_hooks().len(),
        next.layout_shifts().len(),
        next.alerts.len(),
        policy,
    );
    next.updated_at = now;

    if next.global_health != state.global_health {
        debug!(
            from = %state.global_health,
            to = %next.global_health,
            event = event.kind(),
            "global health changed"
        );
    }

    Ok(next)
}
