//! Tests for error classification and display

use prometheus_throttle::core::{ErrorKind, OperationError, SchedulerError};

#[test]
fn test_status_classification() {
    assert_eq!(OperationError::from_status(429, "slow down").kind(), ErrorKind::RateLimited);
    assert_eq!(OperationError::from_status(503, "unavailable").kind(), ErrorKind::TransientService);
    assert_eq!(OperationError::from_status(504, "gateway timeout").kind(), ErrorKind::TransientService);
    assert_eq!(OperationError::from_status(401, "bad key").kind(), ErrorKind::Permanent);
    assert_eq!(OperationError::from_status(500, "server error").kind(), ErrorKind::Permanent);
}

#[test]
fn test_message_inference() {
    assert_eq!(
        OperationError::inferred("Rate limit reached for gpt-4").kind(),
        ErrorKind::RateLimited
    );
    assert_eq!(
        OperationError::inferred("You exceeded your current quota").kind(),
        ErrorKind::RateLimited
    );
    assert_eq!(
        OperationError::inferred("503 Service Unavailable").kind(),
        ErrorKind::TransientService
    );
    assert_eq!(
        OperationError::inferred("invalid JSON in request body").kind(),
        ErrorKind::Permanent
    );
}

#[test]
fn test_scheduler_error_display() {
    let err = SchedulerError::RetriesExhausted {
        attempts: 5,
        last_error: "429 Too Many Requests".into(),
    };
    assert_eq!(
        err.to_string(),
        "retries exhausted after 5 attempts: 429 Too Many Requests"
    );
    assert_eq!(SchedulerError::QueueFull { depth: 3 }.to_string(), "queue full: 3 tasks waiting");
    assert_eq!(SchedulerError::Cancelled.to_string(), "task cancelled");
    assert_eq!(SchedulerError::Shutdown.to_string(), "scheduler shut down");
}

#[test]
fn test_operation_kind_only_for_operation_errors() {
    let wrapped: SchedulerError = OperationError::permanent("bad prompt").into();
    assert_eq!(wrapped.operation_kind(), Some(ErrorKind::Permanent));
    assert_eq!(SchedulerError::Cancelled.operation_kind(), None);
}
