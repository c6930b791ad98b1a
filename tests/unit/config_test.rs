//! Tests for configuration validation and loading

use std::time::Duration;

use prometheus_throttle::config::{GatewayConfig, ThrottleConfig};

#[test]
fn test_throttle_config_defaults_are_valid() {
    let cfg = ThrottleConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.period_ms, 60_000);
    assert_eq!(cfg.max_per_period, 15);
    assert_eq!(cfg.min_interval_ms, 2_000);
    assert_eq!(cfg.max_retries, 5);
    assert_eq!(cfg.max_queue_depth, None);
}

#[test]
fn test_throttle_config_invalid_period() {
    let invalid = ThrottleConfig {
        period_ms: 0,
        ..ThrottleConfig::default()
    };
    assert!(invalid.validate().unwrap_err().contains("period_ms"));
}

#[test]
fn test_throttle_config_invalid_quota() {
    let invalid = ThrottleConfig {
        max_per_period: 0,
        ..ThrottleConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_throttle_config_invalid_retries() {
    let invalid = ThrottleConfig {
        max_retries: 0,
        ..ThrottleConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_throttle_config_base_above_ceiling() {
    let invalid = ThrottleConfig {
        base_delay_ms: 60_000,
        max_delay_ms: 30_000,
        ..ThrottleConfig::default()
    };
    assert!(invalid.validate().unwrap_err().contains("base_delay_ms"));
}

#[test]
fn test_throttle_config_zero_queue_depth() {
    let invalid = ThrottleConfig {
        max_queue_depth: Some(0),
        ..ThrottleConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_throttle_config_partial_json_takes_defaults() {
    let cfg = ThrottleConfig::from_json_str(r#"{ "max_per_period": 3, "max_queue_depth": 50 }"#)
        .unwrap();
    assert_eq!(cfg.max_per_period, 3);
    assert_eq!(cfg.max_queue_depth, Some(50));

    let limits = cfg.limits();
    assert_eq!(limits.admission.period, Duration::from_secs(60));
    assert_eq!(limits.admission.max_per_period, 3);
    assert_eq!(limits.backoff.rate_limit_floor, Duration::from_secs(10));
    assert_eq!(limits.max_queue_depth, Some(50));
}

#[test]
fn test_throttle_config_rejects_bad_json() {
    assert!(ThrottleConfig::from_json_str("{ not json").is_err());
    assert!(ThrottleConfig::from_json_str(r#"{ "max_retries": 0 }"#).is_err());
}

#[test]
fn test_throttle_config_from_path() {
    let path = std::env::temp_dir().join(format!("throttle-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "min_interval_ms": 500 }"#).unwrap();

    let cfg = ThrottleConfig::from_path(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(cfg.admission_limits().min_interval, Duration::from_millis(500));
}

#[test]
fn test_throttle_config_missing_path_names_file() {
    let err = ThrottleConfig::from_path("/nonexistent/throttle.json").unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/throttle.json"));
}

#[test]
fn test_gateway_config_validation() {
    let mut schedulers = std::collections::HashMap::new();
    schedulers.insert("openai".to_string(), ThrottleConfig::default());

    let config = GatewayConfig { schedulers };
    assert!(config.validate().is_ok());
}

#[test]
fn test_gateway_config_empty() {
    assert!(GatewayConfig::default().validate().is_err());
}

#[test]
fn test_gateway_config_from_json() {
    let json = r#"{
        "schedulers": {
            "openai": { "max_per_period": 15, "min_interval_ms": 2000 },
            "search": { "period_ms": 1000, "max_per_period": 5, "min_interval_ms": 0 }
        }
    }"#;

    let config = GatewayConfig::from_json_str(json).unwrap();
    assert_eq!(config.schedulers.len(), 2);
    assert_eq!(config.schedulers["search"].period_ms, 1_000);
}

#[test]
fn test_gateway_config_names_invalid_scheduler() {
    let json = r#"{ "schedulers": { "broken": { "period_ms": 0 } } }"#;
    let err = GatewayConfig::from_json_str(json).unwrap_err();
    assert!(err.contains("broken"));
}
