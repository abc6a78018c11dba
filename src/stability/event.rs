use serde::{Deserialize, Serialize};

use super::error::{Result, StabilityError};
use super::layout::Rect;
use super::metrics::MetricsPatch;

/// Everything that can change tracking state. Reporters construct events
/// (usually through the monitor's convenience methods) and the reducer folds
/// them into a fresh snapshot one at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StabilityEvent {
    /// Partial metrics report for a module (merge-present-fields semantics).
    ModulePatched {
        module_id: String,
        patch: MetricsPatch,
    },
    /// One render pass completed.
    RenderRecorded { module_id: String },
    /// A caught error attributed to a module.
    ErrorRecorded { module_id: String, message: String },
    /// A module recovered after a failure.
    RecoveryRecorded { module_id: String },
    /// A module crashed outright.
    CrashRecorded {
        module_id: String,
        message: Option<String>,
    },
    /// A shared-state accessor was invoked from a module.
    HookUsed {
        hook_name: String,
        module_id: String,
        source: Option<String>,
    },
    /// A UI region's rectangle was measured.
    LayoutMeasured { element_id: String, rect: Rect },
    /// Free-text protection alert.
    AlertRaised { message: String },
    /// Empty the alert log and detection history.
    AlertsCleared,
}

impl StabilityEvent {
    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            StabilityEvent::ModulePatched { .. } => "module_patched",
            StabilityEvent::RenderRecorded { .. } => "render_recorded",
            StabilityEvent::ErrorRecorded { .. } => "error_recorded",
            StabilityEvent::RecoveryRecorded { .. } => "recovery_recorded",
            StabilityEvent::CrashRecorded { .. } => "crash_recorded",
            StabilityEvent::HookUsed { .. } => "hook_used",
            StabilityEvent::LayoutMeasured { .. } => "layout_measured",
            StabilityEvent::AlertRaised { .. } => "alert_raised",
            StabilityEvent::AlertsCleared => "alerts_cleared",
        }
    }

    /// Stateless shape validation; stateful checks (counter monotonicity)
    /// happen inside the reducer where the current record is at hand.
    pub fn validate(&self) -> Result<()> {
        match self {
            StabilityEvent::ModulePatched { module_id, patch } => {
                require_id("module_id", module_id)?;
                patch.validate()
            }
            StabilityEvent::RenderRecorded { module_id }
            | StabilityEvent::RecoveryRecorded { module_id }
            | StabilityEvent::CrashRecorded { module_id, .. } => {
                require_id("module_id", module_id)
            }
            StabilityEvent::ErrorRecorded { module_id, message } => {
                require_id("module_id", module_id)?;
                require_id("error message", message)
            }
            StabilityEvent::HookUsed {
                hook_name,
                module_id,
                ..
            } => {
                require_id("hook_name", hook_name)?;
                require_id("module_id", module_id)
            }
            StabilityEvent::LayoutMeasured { element_id, rect } => {
                require_id("element_id", element_id)?;
                rect.validate()
            }
            StabilityEvent::AlertRaised { message } => require_id("alert message", message),
            StabilityEvent::AlertsCleared => Ok(()),
        }
    }
}

fn require_id(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StabilityError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ids_are_rejected() {
        let event = StabilityEvent::RenderRecorded {
            module_id: "  ".to_string(),
        };
        assert!(event.validate().is_err());

        let event = StabilityEvent::HookUsed {
            hook_name: "use_roster".to_string(),
            module_id: String::new(),
            source: None,
        };
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_bad_rect_is_rejected() {
        let event = StabilityEvent::LayoutMeasured {
            element_id: "sidebar".to_string(),
            rect: Rect::new(f64::NAN, 0.0, 10.0, 10.0),
        };
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_well_formed_events_pass() {
        let events = [
            StabilityEvent::RenderRecorded {
                module_id: "shell".to_string(),
            },
            StabilityEvent::ModulePatched {
                module_id: "shell".to_string(),
                patch: MetricsPatch {
                    load_time_ms: Some(42.0),
                    ..Default::default()
                },
            },
            StabilityEvent::LayoutMeasured {
                element_id: "shell".to_string(),
                rect: Rect::new(-10.0, 0.0, 100.0, 50.0),
            },
            StabilityEvent::AlertsCleared,
        ];
        for event in events {
            assert!(event.validate().is_ok(), "expected {event:?} to validate");
        }
    }
}
