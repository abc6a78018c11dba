//! End-to-end scenarios against the public monitor API.


use std::sync::Arc;

use approx::assert_relative_eq;
use test_helpers::{errors, make_critical, make_duplicate, make_shift, monitor, monitor_with_threshold, rect};
use tracing_test::traced_test;
use vigil::stability::{GlobalHealth, MetricsPatch, ModuleHealth, StabilityExporter};

#[test]
fn escalation_from_healthy_to_critical() {
    let m = monitor();

    m.report_module_event("userList", errors(1));
    let metrics = m.module_health("userList").unwrap();
    assert_eq!(metrics.health, ModuleHealth::Healthy);
    assert_eq!(m.global_health(), GlobalHealth::Stable);
    assert!(m.is_stable());

    m.report_module_event("userList", errors(6));
    let metrics = m.module_health("userList").unwrap();
    assert_eq!(metrics.health, ModuleHealth::Critical);
    assert_eq!(m.global_health(), GlobalHealth::Unstable);
    assert!(!m.is_stable());
}

#[test]
fn duplicate_hooks_are_sticky_across_owner_churn() {
    let m = monitor();
    m.report_hook_usage("hookA", "moduleX", None);
    m.report_hook_usage("hookA", "moduleY", None);
    m.report_hook_usage("hookA", "moduleX", None);

    let duplicates = m.duplicate_hooks();
    assert_eq!(duplicates.len(), 1);
    let record = &duplicates[0];
    assert!(record.is_duplicate);
    assert_eq!(record.usage_count, 3);
    assert_eq!(record.module_id, "moduleX");
}

#[test]
fn single_module_usage_never_flags() {
    let m = monitor();
    m.report_hook_usage("hookA", "moduleX", None);
    m.report_hook_usage("hookA", "moduleX", None);
    assert!(m.duplicate_hooks().is_empty());
    assert_eq!(m.global_health(), GlobalHealth::Stable);
}

#[test]
fn layout_baseline_survives_later_measurements() {
    let m = monitor();
    m.report_layout("e1", rect(0.0, 0.0));
    m.report_layout("e1", rect(10.0, 0.0));

    let shifts = m.layout_shifts();
    assert_eq!(shifts.len(), 1);
    let record = &shifts[0];
    assert_relative_eq!(record.original.top, 0.0);
    assert_relative_eq!(record.current.top, 10.0);
    assert!(record.has_shift);
    assert_relative_eq!(record.shift_amount, 10.0);
}

#[test]
fn five_pixel_moves_stay_in_tolerance() {
    let m = monitor();
    m.report_layout("card", rect(100.0, 100.0));

    m.report_layout("card", rect(105.0, 100.0));
    assert!(m.layout_shifts().is_empty());

    m.report_layout("card", rect(105.01, 100.0));
    let shifts = m.layout_shifts();
    assert_eq!(shifts.len(), 1);
    assert_relative_eq!(shifts[0].shift_amount, 5.01);
}

#[test]
fn alert_log_keeps_newest_ten_in_order() {
    let m = monitor();
    for i in 0..15 {
        m.add_alert(format!("alert {i}"));
    }

    let snapshot = m.snapshot();
    assert_eq!(snapshot.alerts.len(), 10);
    let messages: Vec<&str> = snapshot.alerts.iter().map(|a| a.message.as_str()).collect();
    let expected: Vec<String> = (5..15).map(|i| format!("alert {i}")).collect();
    assert_eq!(messages, expected.iter().map(String::as_str).collect::<Vec<_>>());
}

#[test]
fn layered_escalation_with_default_threshold() {
    let m = monitor_with_threshold(3);

    // Two shifted layouts alone degrade to warning.
    make_shift(&m, "banner");
    make_shift(&m, "sidebar");
    assert_eq!(m.global_health(), GlobalHealth::Warning);
    assert!(m.is_stable());

    // A critical module destabilizes outright.
    make_critical(&m, "billing");
    assert_eq!(m.global_health(), GlobalHealth::Unstable);
    assert!(!m.is_stable());
}

#[test]
fn three_duplicate_hooks_destabilize() {
    let m = monitor();
    make_duplicate(&m, "use_session");
    make_duplicate(&m, "use_roster");
    assert_eq!(m.global_health(), GlobalHealth::Warning);

    make_duplicate(&m, "use_billing");
    assert_eq!(m.global_health(), GlobalHealth::Unstable);
}

#[test]
fn reads_are_idempotent() {
    let m = monitor();
    make_critical(&m, "billing");
    make_duplicate(&m, "use_session");
    make_shift(&m, "banner");

    let a = m.snapshot();
    let b = m.snapshot();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(m.module_health("billing"), m.module_health("billing"));
    assert_eq!(m.duplicate_hooks(), m.duplicate_hooks());
    assert_eq!(m.layout_shifts(), m.layout_shifts());
}

#[test]
fn clear_alerts_drops_history_but_not_conditions() {
    let m = monitor();
    make_duplicate(&m, "use_session");
    make_shift(&m, "banner");
    make_critical(&m, "billing");

    let before = m.snapshot();
    assert!(!before.alerts.is_empty());
    assert_eq!(before.detections.len(), 3);

    m.clear_alerts();
    let after = m.snapshot();
    assert!(after.alerts.is_empty());
    assert!(after.detections.is_empty());
    // The detected conditions are untouched and global health still reflects
    // them.
    assert_eq!(m.duplicate_hooks().len(), 1);
    assert_eq!(m.layout_shifts().len(), 1);
    assert_eq!(m.global_health(), GlobalHealth::Unstable);
}

#[test]
fn warning_module_count_gates_stability() {
    let m = monitor_with_threshold(2);
    for module in ["a", "b"] {
        m.report_module_event(module, errors(3));
    }
    // Two warning modules at threshold 2: still tolerated.
    assert_eq!(m.global_health(), GlobalHealth::Stable);
    assert!(m.is_stable());

    m.report_module_event("c", errors(3));
    // Global health alone does not escalate on warning modules, but the
    // consumer-facing gate trips.
    assert_eq!(m.global_health(), GlobalHealth::Stable);
    assert!(!m.is_stable());
}

#[test]
fn status_report_summarizes_all_signals() {
    let m = monitor();
    make_critical(&m, "billing");
    m.report_module_event("checkout", errors(3));
    make_duplicate(&m, "use_session");
    make_shift(&m, "banner");

    let report = m.status_report();
    assert_eq!(report.global_health, GlobalHealth::Unstable);
    assert!(!report.stable);
    assert_eq!(report.critical_modules, vec!["billing".to_string()]);
    assert_eq!(report.warning_modules, vec!["checkout".to_string()]);
    assert_eq!(report.duplicate_hooks, vec!["use_session".to_string()]);
    assert_eq!(report.shifted_layouts.len(), 1);
    assert!(report.shifted_layouts[0].starts_with("banner"));

    // The report serializes and renders without losing the headline status.
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"global_health\":\"unstable\""));
    assert!(report.render().contains("Health: unstable"));
}

#[test]
fn exporter_tracks_monitor_snapshots() {
    let m = monitor();
    let exporter = StabilityExporter::new().unwrap();

    exporter.update(&m.snapshot());
    assert!(exporter.gather().contains("vigil_global_health 0"));

    make_critical(&m, "billing");
    exporter.update(&m.snapshot());
    let text = exporter.gather();
    assert!(text.contains("vigil_global_health 2"));
    assert!(text.contains("vigil_critical_modules 1"));
    assert!(text.contains("vigil_module_errors_total 6"));
}

#[test]
#[traced_test]
fn invalid_reports_are_logged_and_swallowed() {
    let m = monitor();
    m.record_render("shell");
    m.report_module_event(
        "shell",
        MetricsPatch {
            load_time_ms: Some(f64::NAN),
            ..Default::default()
        },
    );

    assert!(logs_contain("stability report ignored"));
    assert_eq!(m.module_health("shell").unwrap().render_count, 1);
}

#[tokio::test]
async fn subscribers_wake_per_accepted_event() {
    let m = monitor();
    let mut rx = m.subscribe();

    m.record_render("shell");
    rx.changed().await.unwrap();
    assert_eq!(
        rx.borrow_and_update().module("shell").unwrap().render_count,
        1
    );

    // A rejected report publishes nothing.
    m.report_layout("", rect(0.0, 0.0));
    assert!(!rx.has_changed().unwrap());
}
