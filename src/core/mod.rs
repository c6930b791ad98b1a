//! Core scheduling abstractions: backoff, retry, admission window and the
//! scheduler that ties them together.

pub mod audit;
pub mod backoff;
pub mod error;
pub mod executor;
pub mod retry;
pub mod scheduler;
pub mod stats;
pub mod task;
pub mod window;

pub use audit::{build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use backoff::{BackoffPolicy, ErrorKind, RetryDecision};
pub use error::{AppResult, OperationError, SchedulerError};
pub use executor::{BoxedOperation, Operation};
pub use retry::RetryExecutor;
pub use scheduler::{Scheduler, SchedulerLimits, Spawn};
pub use stats::SchedulerStats;
pub use task::{TaskContext, TaskHandle, TaskId, TaskOutcome};
pub use window::{AdmissionLimits, AdmissionWindow};
