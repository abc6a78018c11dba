use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Usage bookkeeping for one logical shared-state accessor.
///
/// The duplicate flag catches the same accessor being invoked from more than
/// one module - a composition smell, not a security signal. Once two distinct
/// module ids have reported the same hook name the flag stays set until the
/// tracking state is torn down; a later report from a single module never
/// clears it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookUsageRecord {
    pub hook_name: String,
    pub usage_count: u64,
    pub last_used: DateTime<Utc>,
    /// Module that most recently reported usage.
    pub module_id: String,
    pub is_duplicate: bool,
    /// Free-text label of the most recent call site, if the reporter gave one.
    pub last_source: Option<String>,
}

impl HookUsageRecord {
    pub fn new(
        hook_name: impl Into<String>,
        module_id: impl Into<String>,
        source: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            hook_name: hook_name.into(),
            usage_count: 1,
            last_used: now,
            module_id: module_id.into(),
            is_duplicate: false,
            last_source: source,
        }
    }

    /// Fold another usage report into this record and return whether this
    /// report flipped the record into the duplicate state. The comparison is
    /// always against the *previous* recorded owner.
    pub fn record_usage(
        &mut self,
        module_id: &str,
        source: Option<&str>,
        now: DateTime<Utc>,
    ) -> bool {
        let was_duplicate = self.is_duplicate;
        if self.module_id != module_id {
            self.is_duplicate = true;
        }
        self.usage_count += 1;
        self.module_id = module_id.to_string();
        self.last_used = now;
        if let Some(source) = source {
            self.last_source = Some(source.to_string());
        }
        self.is_duplicate && !was_duplicate
    }
}
