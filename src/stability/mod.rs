pub mod error;
pub mod event;
pub mod export;
pub mod health;
pub mod hooks;
pub mod layout;
pub mod metrics;
pub mod monitor;
pub mod sampler;
pub mod state;

pub use error::*;
pub use event::*;
pub use export::*;
pub use health::*;
pub use hooks::*;
pub use layout::*;
pub use metrics::*;
pub use monitor::*;
pub use sampler::*;
pub use state::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound on the protection alert log; oldest entries are evicted first.
pub const MAX_PROTECTION_ALERTS: usize = 10;

/// Process-wide advisory status summarizing the worst signals across
/// modules, hooks, and layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalHealth {
    Stable,
    Warning,
    Unstable,
}

impl GlobalHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            GlobalHealth::Stable => "stable",
            GlobalHealth::Warning => "warning",
            GlobalHealth::Unstable => "unstable",
        }
    }
}

impl std::fmt::Display for GlobalHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in the bounded rolling alert log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectionAlert {
    pub id: Uuid,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

impl ProtectionAlert {
    pub fn new(message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            raised_at: now,
        }
    }
}

/// Anomaly history entry, kept purely for alert/history purposes.
///
/// Clearing alerts drops these entries but leaves the sticky flags on the
/// underlying hook and layout records untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(flatten)]
    pub kind: DetectionKind,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectionKind {
    DuplicateHook {
        hook_name: String,
        previous_module: String,
        module_id: String,
        source: Option<String>,
    },
    LayoutShift {
        element_id: String,
        shift_amount: f64,
    },
    ModuleCritical {
        module_id: String,
    },
}

impl Detection {
    pub fn new(kind: DetectionKind, now: DateTime<Utc>) -> Self {
        Self {
            kind,
            detected_at: now,
        }
    }

    /// Human-readable description, also used as the protection alert text.
    pub fn describe(&self) -> String {
        match &self.kind {
            DetectionKind::DuplicateHook {
                hook_name,
                previous_module,
                module_id,
                source,
            } => match source {
                Some(source) => format!(
                    "Duplicate hook usage: '{hook_name}' reported by '{module_id}' ({source}) after '{previous_module}'"
                ),
                None => format!(
                    "Duplicate hook usage: '{hook_name}' reported by '{module_id}' after '{previous_module}'"
                ),
            },
            DetectionKind::LayoutShift {
                element_id,
                shift_amount,
            } => format!(
                "Layout shift: '{element_id}' moved {shift_amount:.1}px from its original position"
            ),
            DetectionKind::ModuleCritical { module_id } => {
                format!("Module '{module_id}' entered critical health")
            }
        }
    }
}
