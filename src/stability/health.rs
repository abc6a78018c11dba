use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::StabilityState;
use super::{GlobalHealth, ModuleHealth};

/// Warning-status modules tolerated before consumers should treat the
/// process as unstable; also the alert-log depth above which global health
/// degrades to warning.
pub const DEFAULT_ALERT_THRESHOLD: usize = 3;

/// Duplicate-hook count above which global health is unstable outright.
const UNSTABLE_DUPLICATE_HOOKS: usize = 2;

/// Layout-shift count above which global health degrades to warning.
const WARNING_LAYOUT_SHIFTS: usize = 1;

/// Tunable inputs to the global health derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthPolicy {
    pub alert_threshold: usize,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
        }
    }
}

impl HealthPolicy {
    pub fn new(alert_threshold: usize) -> Self {
        Self { alert_threshold }
    }
}

/// Derive the process-wide status from the worst signals across trackers.
pub fn derive_global_health(
    critical_modules: usize,
    duplicate_hooks: usize,
    layout_shifts: usize,
    alert_log_len: usize,
    policy: &HealthPolicy,
) -> GlobalHealth {
    if critical_modules > 0 || duplicate_hooks > UNSTABLE_DUPLICATE_HOOKS {
        GlobalHealth::Unstable
    } else if duplicate_hooks > 0
        || layout_shifts > WARNING_LAYOUT_SHIFTS
        || alert_log_len > policy.alert_threshold
    {
        GlobalHealth::Warning
    } else {
        GlobalHealth::Stable
    }
}

/// Consumer-facing gate: unstable health always fails it, and so does an
/// excessive number of warning-status modules.
pub fn is_stable(global_health: GlobalHealth, warning_modules: usize, policy: &HealthPolicy) -> bool {
    global_health != GlobalHealth::Unstable && warning_modules <= policy.alert_threshold
}

/// Snapshot summary for dashboards and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub generated_at: DateTime<Utc>,
    pub global_health: GlobalHealth,
    pub stable: bool,
    pub modules_tracked: usize,
    pub critical_modules: Vec<String>,
    pub warning_modules: Vec<String>,
    pub duplicate_hooks: Vec<String>,
    pub shifted_layouts: Vec<String>,
    pub detections_recorded: usize,
    pub recent_alerts: Vec<String>,
}

impl StatusReport {
    pub fn new(state: &StabilityState, policy: &HealthPolicy) -> Self {
        let mut critical_modules: Vec<String> = state
            .modules
            .values()
            .filter(|m| m.health == ModuleHealth::Critical)
            .map(|m| m.module_id.clone())
            .collect();
        critical_modules.sort();

        let mut warning_modules: Vec<String> = state
            .modules
            .values()
            .filter(|m| m.health == ModuleHealth::Warning)
            .map(|m| m.module_id.clone())
            .collect();
        warning_modules.sort();

        let mut duplicate_hooks: Vec<String> = state
            .duplicate_hooks()
            .iter()
            .map(|h| h.hook_name.clone())
            .collect();
        duplicate_hooks.sort();

        let mut shifted_layouts: Vec<String> = state
            .layout_shifts()
            .iter()
            .map(|l| format!("{} ({:.1}px)", l.element_id, l.shift_amount))
            .collect();
        shifted_layouts.sort();

        let stable = is_stable(state.global_health, warning_modules.len(), policy);

        Self {
            generated_at: Utc::now(),
            global_health: state.global_health,
            stable,
            modules_tracked: state.modules.len(),
            critical_modules,
            warning_modules,
            duplicate_hooks,
            shifted_layouts,
            detections_recorded: state.detections.len(),
            recent_alerts: state.alerts.iter().map(|a| a.message.clone()).collect(),
        }
    }

    /// Plain-text rendering for terminal consumers.
    pub fn render(&self) -> String {
        let mut report = String::new();
        report.push_str("=== Vigil Stability Report ===\n\n");

        report.push_str("Global Status:\n");
        report.push_str(&format!("  Health: {}\n", self.global_health));
        report.push_str(&format!(
            "  Stable: {}\n",
            if self.stable { "yes" } else { "no" }
        ));
        report.push_str(&format!("  Modules tracked: {}\n", self.modules_tracked));

        report.push_str("\nModule Health:\n");
        report.push_str(&format!(
            "  Critical: {}\n",
            list_or_none(&self.critical_modules)
        ));
        report.push_str(&format!(
            "  Warning: {}\n",
            list_or_none(&self.warning_modules)
        ));

        report.push_str("\nDetections:\n");
        report.push_str(&format!(
            "  Duplicate hooks: {}\n",
            list_or_none(&self.duplicate_hooks)
        ));
        report.push_str(&format!(
            "  Shifted layouts: {}\n",
            list_or_none(&self.shifted_layouts)
        ));
        report.push_str(&format!("  Recorded: {}\n", self.detections_recorded));

        report.push_str("\nRecent Alerts:\n");
        if self.recent_alerts.is_empty() {
            report.push_str("  (none)\n");
        } else {
            for alert in &self.recent_alerts {
                report.push_str(&format!("  - {alert}\n"));
            }
        }

        report
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
