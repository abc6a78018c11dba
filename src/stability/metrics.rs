use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{Result, StabilityError};

/// Error count above which a module is considered critical.
pub const CRITICAL_ERROR_THRESHOLD: u64 = 5;

/// Error count above which a module is considered degraded.
pub const WARNING_ERROR_THRESHOLD: u64 = 2;

/// Derived per-module health. Always recomputed from the counters, never
/// stored independently of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleHealth {
    Healthy,
    Warning,
    Critical,
    Recovering,
}

impl ModuleHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleHealth::Healthy => "healthy",
            ModuleHealth::Warning => "warning",
            ModuleHealth::Critical => "critical",
            ModuleHealth::Recovering => "recovering",
        }
    }
}

impl std::fmt::Display for ModuleHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health counters and derived status for one tracked module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleMetrics {
    pub module_id: String,
    pub render_count: u64,
    pub error_count: u64,
    pub recovery_count: u64,
    pub crash_count: u64,
    pub last_error: Option<String>,
    /// Derived from `load_time_ms`, in [0, 100].
    pub performance_score: f64,
    pub load_time_ms: f64,
    /// Derived from the counters above.
    pub health: ModuleHealth,
    pub last_reported: DateTime<Utc>,
}

impl ModuleMetrics {
    /// Zero-valued record for a module seen for the first time.
    pub fn new(module_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            module_id: module_id.into(),
            render_count: 0,
            error_count: 0,
            recovery_count: 0,
            crash_count: 0,
            last_error: None,
            performance_score: 100.0,
            load_time_ms: 0.0,
            health: ModuleHealth::Healthy,
            last_reported: now,
        }
    }

    /// Merge a partial report into this record. Fields present in the patch
    /// overwrite, absent fields are retained, and the derived fields are
    /// recomputed afterwards. Callers must validate the patch first.
    pub fn apply_patch(&mut self, patch: &MetricsPatch, now: DateTime<Utc>) {
        if let Some(renders) = patch.render_count {
            self.render_count = renders;
        }
        if let Some(errors) = patch.error_count {
            self.error_count = errors;
        }
        if let Some(recoveries) = patch.recovery_count {
            self.recovery_count = recoveries;
        }
        if let Some(crashes) = patch.crash_count {
            self.crash_count = crashes;
        }
        if let Some(ref message) = patch.last_error {
            self.last_error = Some(message.clone());
        }
        if let Some(load_time) = patch.load_time_ms {
            self.load_time_ms = load_time;
        }
        self.recompute_derived(now);
    }

    /// Recompute `health` and `performance_score` from the raw fields.
    pub fn recompute_derived(&mut self, now: DateTime<Utc>) {
        self.health = derive_health(self.error_count, self.recovery_count, self.crash_count);
        self.performance_score = performance_score(self.load_time_ms);
        self.last_reported = now;
    }
}

/// Pure health derivation from the three counters that feed it.
pub fn derive_health(error_count: u64, recovery_count: u64, crash_count: u64) -> ModuleHealth {
    if error_count > CRITICAL_ERROR_THRESHOLD {
        ModuleHealth::Critical
    } else if error_count > WARNING_ERROR_THRESHOLD {
        ModuleHealth::Warning
    } else if recovery_count > crash_count {
        ModuleHealth::Recovering
    } else {
        ModuleHealth::Healthy
    }
}

/// Performance score on a 0-100 scale: a 0ms load scores 100, every 10ms
/// shaves one point, 1000ms or slower bottoms out at 0.
pub fn performance_score(load_time_ms: f64) -> f64 {
    (100.0 - load_time_ms / 10.0).clamp(0.0, 100.0)
}

/// Partial module report. Counter fields carry absolute values and may only
/// move forward; `load_time_ms` must be a finite, non-negative measurement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsPatch {
    pub render_count: Option<u64>,
    pub error_count: Option<u64>,
    pub recovery_count: Option<u64>,
    pub crash_count: Option<u64>,
    pub last_error: Option<String>,
    pub load_time_ms: Option<f64>,
}

impl MetricsPatch {
    /// Stateless shape validation.
    pub fn validate(&self) -> Result<()> {
        if let Some(load_time) = self.load_time_ms {
            if !load_time.is_finite() {
                return Err(StabilityError::Validation(format!(
                    "load_time_ms must be finite, got {load_time}"
                )));
            }
            if load_time < 0.0 {
                return Err(StabilityError::Validation(format!(
                    "load_time_ms must be non-negative, got {load_time}"
                )));
            }
        }
        Ok(())
    }

    /// Counters are monotonically non-decreasing; a patch that would move one
    /// backwards is rejected wholesale and the previous state retained.
    pub fn ensure_monotonic(&self, existing: &ModuleMetrics) -> Result<()> {
        let checks = [
            ("render_count", self.render_count, existing.render_count),
            ("error_count", self.error_count, existing.error_count),
            ("recovery_count", self.recovery_count, existing.recovery_count),
            ("crash_count", self.crash_count, existing.crash_count),
        ];
        for (field, patched, current) in checks {
            if let Some(patched) = patched {
                if patched < current {
                    return Err(StabilityError::Validation(format!(
                        "{field} for module '{}' would decrease from {current} to {patched}",
                        existing.module_id
                    )));
                }
            }
        }
        Ok(())
    }

}
