//! Runtime stability monitoring for modular UI applications.
//!
//! `vigil` tracks four cooperating signal families and derives one advisory
//! process-wide status from them: per-module health counters, shared-state
//! accessor ("hook") usage duplication, layout drift of observed UI regions,
//! and a bounded rolling log of protection alerts.
//!
//! The entry point is [`StabilityMonitor`]: an explicit service object that
//! folds every report through a pure reducer into immutable snapshots and
//! publishes them over a watch channel.

pub mod config;
pub mod stability;

pub use config::{create_sample_env_file, MonitorConfig};

pub use stability::{
    derive_global_health, derive_health, is_stable, performance_score, Detection, DetectionKind,
    GlobalHealth, HealthPolicy, HookUsageRecord, LayoutRecord, MetricsPatch, ModuleHealth,
    ModuleMetrics, PerformanceSampler, ProbeReading, ProtectionAlert, Rect, Result,
    RuntimeProbe, SamplerConfig, StabilityError, StabilityEvent, StabilityExporter,
    StabilityMonitor, StabilityState, StatusReport, SystemProbe,
};
