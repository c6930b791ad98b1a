//! Tests for builder modules

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use prometheus_throttle::builders::{build_schedulers, SchedulerBuilder};
use prometheus_throttle::config::{GatewayConfig, ThrottleConfig};
use prometheus_throttle::core::{
    AuditAction, InMemoryAuditSink, OperationError, Scheduler, SchedulerError, TaskContext,
};
use prometheus_throttle::runtime::TokioSpawner;

#[tokio::test]
async fn test_scheduler_builder_defaults() {
    let builder = SchedulerBuilder::new("openai", TokioSpawner::current());
    assert_eq!(builder.name(), "openai");
    assert_eq!(builder.throttle_config(), &ThrottleConfig::default());

    let scheduler: Scheduler<u8, _> = builder.build().unwrap();
    assert_eq!(scheduler.name(), "openai");
    assert_eq!(scheduler.limits().admission.max_per_period, 15);
}

#[tokio::test]
async fn test_scheduler_builder_rejects_invalid_config() {
    let result: Result<Scheduler<u8, _>, _> = SchedulerBuilder::new("broken", TokioSpawner::current())
        .config(ThrottleConfig {
            max_retries: 0,
            ..ThrottleConfig::default()
        })
        .build();
    match result {
        Err(SchedulerError::InvalidConfig(msg)) => assert!(msg.contains("broken")),
        Err(other) => panic!("expected InvalidConfig, got {other:?}"),
        Ok(_) => panic!("expected InvalidConfig"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_builder_wires_audit_sink() {
    let sink = InMemoryAuditSink::new(16);
    let scheduler: Scheduler<u8, _> = SchedulerBuilder::new("audited", TokioSpawner::current())
        .config(ThrottleConfig {
            min_interval_ms: 0,
            ..ThrottleConfig::default()
        })
        .audit_sink(Arc::new(sink.clone()))
        .build()
        .unwrap();

    scheduler
        .run(|| async { Ok::<u8, OperationError>(1) }, TaskContext::new("ping"))
        .await
        .unwrap();

    assert_eq!(sink.task_ids(AuditAction::Succeeded).len(), 1);
    assert_eq!(scheduler.limits().admission.min_interval, Duration::ZERO);
}

#[tokio::test]
async fn test_build_schedulers_per_service() {
    let mut schedulers = HashMap::new();
    schedulers.insert("openai".to_string(), ThrottleConfig::default());
    schedulers.insert(
        "search".to_string(),
        ThrottleConfig {
            max_per_period: 100,
            ..ThrottleConfig::default()
        },
    );
    let cfg = GatewayConfig { schedulers };

    let built = build_schedulers::<String, _>(&cfg, TokioSpawner::current()).unwrap();

    assert_eq!(built.len(), 2);
    assert_eq!(built["search"].limits().admission.max_per_period, 100);
    assert_eq!(built["openai"].name(), "openai");
}

#[tokio::test]
async fn test_build_schedulers_rejects_empty_gateway() {
    let result = build_schedulers::<String, _>(&GatewayConfig::default(), TokioSpawner::current());
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}
