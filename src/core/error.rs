//! Error types for scheduled operations and scheduler outcomes.

use thiserror::Error;

use crate::core::backoff::ErrorKind;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a caller-supplied operation.
///
/// The operation decides the [`ErrorKind`]; the retry executor only reads it.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct OperationError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl OperationError {
    /// Create an error with an explicit classification.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Quota or 429-style rejection from the downstream service.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    /// 502/503/504 or timeout from the downstream service.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransientService, message)
    }

    /// Validation, auth or malformed-input failure. Never retried.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permanent, message)
    }

    /// Classify from an HTTP status code.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::from_http_status(status), message)
    }

    /// Classify by inspecting the message text.
    ///
    /// Only for wrapping errors that carry no structured status. Prefer the
    /// explicit constructors.
    pub fn inferred(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorKind::infer_from_message(&message), message)
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Classification used by the retry executor.
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Terminal outcome errors surfaced to callers of the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Non-retryable operation failure, surfaced after a single attempt.
    #[error(transparent)]
    Operation(#[from] OperationError),
    /// Every permitted attempt failed.
    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Message of the final failure.
        last_error: String,
    },
    /// Bounded queue is at capacity.
    #[error("queue full: {depth} tasks waiting")]
    QueueFull {
        /// Queue depth at the time of rejection.
        depth: usize,
    },
    /// Caller cancelled the task before it completed.
    #[error("task cancelled")]
    Cancelled,
    /// Scheduler shut down before the task ran.
    #[error("scheduler shut down")]
    Shutdown,
    /// The consumer stopped before resolving the task.
    #[error("task abandoned before an outcome was recorded")]
    Abandoned,
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SchedulerError {
    /// Classification of the underlying operation failure, if any.
    pub const fn operation_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Operation(err) => Some(err.kind()),
            _ => None,
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
