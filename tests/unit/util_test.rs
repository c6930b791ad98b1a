//! Tests for utility functions

use prometheus_throttle::core::TaskId;
use prometheus_throttle::util::{now_ms, DEFAULT_LOG_DIRECTIVE};

#[test]
fn test_now_ms_is_monotonic_enough() {
    let a = now_ms();
    let b = now_ms();
    assert!(a > 0);
    assert!(b >= a);
}

#[test]
fn test_default_log_directive_targets_crate() {
    assert!(DEFAULT_LOG_DIRECTIVE.starts_with("prometheus_throttle"));
}

#[test]
fn test_init_tracing_is_idempotent() {
    prometheus_throttle::util::init_tracing();
    prometheus_throttle::util::init_tracing();
}

#[test]
fn test_task_ids_are_unique_and_serializable() {
    let a = TaskId::new();
    let b = TaskId::new();
    assert_ne!(a, b);

    let json = serde_json::to_string(&a).unwrap();
    let back: TaskId = serde_json::from_str(&json).unwrap();
    assert_eq!(a, back);
    assert_eq!(json.trim_matches('"'), a.to_string());
}
