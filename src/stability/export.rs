use prometheus::{Gauge, IntGauge, Opts, Registry, TextEncoder};
use tracing::error;

use super::error::Result;
use super::state::StabilityState;
use super::GlobalHealth;

/// Translates a stability snapshot into Prometheus gauges.
///
/// Gauges rather than counters throughout: the snapshot already carries
/// cumulative values, and re-setting a gauge from the latest snapshot keeps
/// the exporter stateless.
pub struct StabilityExporter {
    registry: Registry,

    global_health: IntGauge,
    modules_tracked: IntGauge,
    critical_modules: IntGauge,
    warning_modules: IntGauge,
    duplicate_hooks: IntGauge,
    layout_shifts: IntGauge,
    protection_alerts: IntGauge,
    detections_recorded: IntGauge,
    total_errors: IntGauge,
    total_renders: IntGauge,
    worst_performance_score: Gauge,
}

impl StabilityExporter {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let global_health = IntGauge::with_opts(Opts::new(
            "vigil_global_health",
            "Global health status (0 stable, 1 warning, 2 unstable)",
        ))?;
        registry.register(Box::new(global_health.clone()))?;

        let modules_tracked = IntGauge::with_opts(Opts::new(
            "vigil_modules_tracked",
            "Number of modules with at least one report",
        ))?;
        registry.register(Box::new(modules_tracked.clone()))?;

        let critical_modules = IntGauge::with_opts(Opts::new(
            "vigil_critical_modules",
            "Number of modules in critical health",
        ))?;
        registry.register(Box::new(critical_modules.clone()))?;

        let warning_modules = IntGauge::with_opts(Opts::new(
            "vigil_warning_modules",
            "Number of modules in warning health",
        ))?;
        registry.register(Box::new(warning_modules.clone()))?;

        let duplicate_hooks = IntGauge::with_opts(Opts::new(
            "vigil_duplicate_hooks",
            "Number of hooks flagged as used from multiple modules",
        ))?;
        registry.register(Box::new(duplicate_hooks.clone()))?;

        let layout_shifts = IntGauge::with_opts(Opts::new(
            "vigil_layout_shifts",
            "Number of regions currently shifted beyond tolerance",
        ))?;
        registry.register(Box::new(layout_shifts.clone()))?;

        let protection_alerts = IntGauge::with_opts(Opts::new(
            "vigil_protection_alerts",
            "Entries currently in the bounded alert log",
        ))?;
        registry.register(Box::new(protection_alerts.clone()))?;

        let detections_recorded = IntGauge::with_opts(Opts::new(
            "vigil_detections_recorded",
            "Anomaly detections recorded since the last clear",
        ))?;
        registry.register(Box::new(detections_recorded.clone()))?;

        let total_errors = IntGauge::with_opts(Opts::new(
            "vigil_module_errors_total",
            "Sum of error counts across all modules",
        ))?;
        registry.register(Box::new(total_errors.clone()))?;

        let total_renders = IntGauge::with_opts(Opts::new(
            "vigil_module_renders_total",
            "Sum of render counts across all modules",
        ))?;
        registry.register(Box::new(total_renders.clone()))?;

        let worst_performance_score = Gauge::with_opts(Opts::new(
            "vigil_worst_performance_score",
            "Lowest per-module performance score (0-100)",
        ))?;
        registry.register(Box::new(worst_performance_score.clone()))?;

        Ok(Self {
            registry,
            global_health,
            modules_tracked,
            critical_modules,
            warning_modules,
            duplicate_hooks,
            layout_shifts,
            protection_alerts,
            detections_recorded,
            total_errors,
            total_renders,
            worst_performance_score,
        })
    }

    /// Overwrite every gauge from the given snapshot.
    pub fn update(&self, state: &StabilityState) {
        self.global_health.set(match state.global_health {
            GlobalHealth::Stable => 0,
            GlobalHealth::Warning => 1,
            GlobalHealth::Unstable => 2,
        });
        self.modules_tracked.set(state.modules.len() as i64);
        self.critical_modules
            .set(state.critical_module_count() as i64);
        self.warning_modules
            .set(state.warning_module_count() as i64);
        self.duplicate_hooks.set(state.duplicate_hooks().len() as i64);
        self.layout_shifts.set(state.layout_shifts().len() as i64);
        self.protection_alerts.set(state.alerts.len() as i64);
        self.detections_recorded.set(state.detections.len() as i64);

        let mut errors: u64 = 0;
        let mut renders: u64 = 0;
        let mut worst_score = 100.0f64;
        for metrics in state.modules.values() {
            errors += metrics.error_count;
            renders += metrics.render_count;
            worst_score = worst_score.min(metrics.performance_score);
        }
        self.total_errors.set(errors as i64);
        self.total_renders.set(renders as i64);
        self.worst_performance_score.set(worst_score);
    }

    /// Prometheus text exposition of the current gauge values.
    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        encoder
            .encode_to_string(&self.registry.gather())
            .unwrap_or_else(|e| {
                error!("failed to encode stability metrics: {e}");
                String::new()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stability::monitor::StabilityMonitor;

    #[test]
    fn test_gauges_reflect_snapshot() {
        let monitor = StabilityMonitor::default();
        monitor.record_render("shell");
        monitor.record_error("shell", "boom");
        monitor.report_hook_usage("use_session", "shell", None);
        monitor.report_hook_usage("use_session", "sidebar", None);

        let exporter = StabilityExporter::new().unwrap();
        exporter.update(&monitor.snapshot());

        let text = exporter.gather();
        assert!(text.contains("vigil_global_health 1"));
        assert!(text.contains("vigil_modules_tracked 1"));
        assert!(text.contains("vigil_duplicate_hooks 1"));
        assert!(text.contains("vigil_module_errors_total 1"));
        assert!(text.contains("vigil_module_renders_total 1"));
    }

    #[test]
    fn test_empty_state_exports_stable_zeroes() {
        let monitor = StabilityMonitor::default();
        let exporter = StabilityExporter::new().unwrap();
        exporter.update(&monitor.snapshot());

        let text = exporter.gather();
        assert!(text.contains("vigil_global_health 0"));
        assert!(text.contains("vigil_modules_tracked 0"));
        assert!(text.contains("vigil_worst_performance_score 100"));
    }
}
