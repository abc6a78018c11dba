use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

use crate::stability::{HealthPolicy, SamplerConfig, DEFAULT_ALERT_THRESHOLD};

/// Process configuration, loaded from `VIGIL_*` environment variables
/// (optionally via a `.env` file). Nothing here is persisted state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Warning-status modules tolerated by `is_stable`, and the alert-log
    /// depth above which global health degrades to warning.
    pub alert_threshold: usize,

    /// Gates installation of the background sampler. When false the API is
    /// still available but nothing feeds it automatically.
    pub monitoring_enabled: bool,

    /// Background sampler settings
    pub sampler: SamplerSettings,

    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerSettings {
    /// Seconds between runtime probe measurements
    pub interval_seconds: u64,

    /// Module id the sampler reports under
    pub module_id: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            monitoring_enabled: true,
            sampler: SamplerSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for SamplerSettings {
    fn default() -> Self {
        let defaults = SamplerConfig::default();
        Self {
            interval_seconds: defaults.interval_seconds,
            module_id: defaults.module_id,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from the environment, falling back to defaults for
    /// anything unset. A malformed value is an error rather than a silent
    /// fallback.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();

        if let Ok(threshold) = env::var("VIGIL_ALERT_THRESHOLD") {
            config.alert_threshold = threshold
                .parse()
                .context("Invalid VIGIL_ALERT_THRESHOLD value")?;
        }

        if let Ok(enabled) = env::var("VIGIL_MONITORING_ENABLED") {
            config.monitoring_enabled = enabled
                .parse()
                .context("Invalid VIGIL_MONITORING_ENABLED value")?;
        }

        if let Ok(interval) = env::var("VIGIL_SAMPLER_INTERVAL_SECONDS") {
            config.sampler.interval_seconds = interval
                .parse()
                .context("Invalid VIGIL_SAMPLER_INTERVAL_SECONDS value")?;
        }

        if let Ok(module_id) = env::var("VIGIL_SAMPLER_MODULE_ID") {
            config.sampler.module_id = module_id;
        }

        if let Ok(level) = env::var("VIGIL_LOG_LEVEL") {
            config.log_level = level;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sampler.interval_seconds == 0 {
            anyhow::bail!("Sampler interval must be at least 1 second");
        }
        if self.sampler.module_id.trim().is_empty() {
            anyhow::bail!("Sampler module id must not be empty");
        }
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            anyhow::bail!(
                "Invalid log level '{}', expected one of {:?}",
                self.log_level,
                valid_levels
            );
        }
        Ok(())
    }

    pub fn health_policy(&self) -> HealthPolicy {
        HealthPolicy::new(self.alert_threshold)
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            interval_seconds: self.sampler.interval_seconds,
            module_id: self.sampler.module_id.clone(),
        }
    }
}

/// Create a sample .env file with default configuration
pub fn create_sample_env_file() -> Result<()> {
    let env_content = r#"# Vigil Stability Monitor Configuration

# Warning-status modules tolerated before the process is reported unstable;
# also the alert-log depth above which global health degrades to warning.
VIGIL_ALERT_THRESHOLD=3

# Install the background runtime sampler (true/false)
VIGIL_MONITORING_ENABLED=true

# Seconds between runtime probe measurements
VIGIL_SAMPLER_INTERVAL_SECONDS=30

# Module id the sampler reports under
VIGIL_SAMPLER_MODULE_ID=runtime

# Log level (error, warn, info, debug, trace)
VIGIL_LOG_LEVEL=info
"#;

    std::fs::write(".env.example", env_content).context("Failed to create .env.example file")?;
    tracing::info!("Created .env.example with default configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_vigil_env() {
        for key in [
            "VIGIL_ALERT_THRESHOLD",
            "VIGIL_MONITORING_ENABLED",
            "VIGIL_SAMPLER_INTERVAL_SECONDS",
            "VIGIL_SAMPLER_MODULE_ID",
            "VIGIL_LOG_LEVEL",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_when_env_unset() {
        clear_vigil_env();
        let config = MonitorConfig::from_env().unwrap();
        assert_eq!(config.alert_threshold, 3);
        assert!(config.monitoring_enabled);
        assert_eq!(config.sampler.interval_seconds, 30);
        assert_eq!(config.sampler.module_id, "runtime");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_vigil_env();
        env::set_var("VIGIL_ALERT_THRESHOLD", "5");
        env::set_var("VIGIL_MONITORING_ENABLED", "false");
        env::set_var("VIGIL_SAMPLER_INTERVAL_SECONDS", "10");
        env::set_var("VIGIL_SAMPLER_MODULE_ID", "ui-shell");

        let config = MonitorConfig::from_env().unwrap();
        assert_eq!(config.alert_threshold, 5);
        assert!(!config.monitoring_enabled);
        assert_eq!(config.sampler.interval_seconds, 10);
        assert_eq!(config.sampler.module_id, "ui-shell");
        clear_vigil_env();
    }

    #[test]
    #[serial]
    fn test_malformed_values_are_errors() {
        clear_vigil_env();
        env::set_var("VIGIL_ALERT_THRESHOLD", "many");
        assert!(MonitorConfig::from_env().is_err());
        clear_vigil_env();
    }

    #[test]
    #[serial]
    fn test_validation_rejects_bad_values() {
        clear_vigil_env();
        let mut config = MonitorConfig::default();
        config.sampler.interval_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }
}
