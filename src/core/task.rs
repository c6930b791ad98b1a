//! Task identity, caller context and the outcome handle.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::time::Instant;
use uuid::Uuid;

use super::{BoxedOperation, SchedulerError};

/// Unique identifier assigned to every submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Opaque caller metadata carried for logging and correlation.
///
/// Never consulted for scheduling decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContext {
    /// Short human-readable label, e.g. the document section being generated.
    pub label: String,
    /// Optional external correlation id (request id, document id).
    pub correlation_id: Option<String>,
}

impl TaskContext {
    /// Context with a label only.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            correlation_id: None,
        }
    }

    /// Attach a correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// Outcome delivered to the caller exactly once.
pub type TaskOutcome<T> = Result<T, SchedulerError>;

/// One queued unit of work.
pub(crate) struct Task<T> {
    pub(crate) id: TaskId,
    pub(crate) operation: BoxedOperation<T>,
    pub(crate) context: TaskContext,
    pub(crate) attempts: u32,
    pub(crate) created_at: Instant,
    pub(crate) created_at_ms: u128,
    pub(crate) outcome: oneshot::Sender<TaskOutcome<T>>,
}

impl<T> Task<T> {
    /// Whether the caller has cancelled or dropped its handle.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.outcome.is_closed()
    }

    /// Resolve the caller's outcome, consuming the task.
    ///
    /// Returns `false` if the caller was no longer listening.
    pub(crate) fn resolve(self, outcome: TaskOutcome<T>) -> bool {
        self.outcome.send(outcome).is_ok()
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("context", &self.context)
            .field("attempts", &self.attempts)
            .field("created_at_ms", &self.created_at_ms)
            .finish_non_exhaustive()
    }
}

/// Caller-side handle to a submitted task.
///
/// Await it to receive the outcome. Dropping the handle, or calling
/// [`TaskHandle::cancel`], withdraws a task that has not been admitted yet.
#[derive(Debug)]
#[must_use = "dropping a TaskHandle cancels the task if it has not started"]
pub struct TaskHandle<T> {
    id: TaskId,
    rx: oneshot::Receiver<TaskOutcome<T>>,
    cancelled: bool,
}

impl<T> TaskHandle<T> {
    pub(crate) const fn new(id: TaskId, rx: oneshot::Receiver<TaskOutcome<T>>) -> Self {
        Self {
            id,
            rx,
            cancelled: false,
        }
    }

    /// Identifier assigned at submission.
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Withdraw the task.
    ///
    /// A task still in the queue is dropped without being admitted. A task
    /// waiting out a retry backoff stops retrying. An attempt already running
    /// is not interrupted. Awaiting the handle afterwards yields
    /// [`SchedulerError::Cancelled`] unless an outcome was already recorded.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.rx.close();
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = TaskOutcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let cancelled = self.cancelled;
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(outcome) => outcome,
            Err(_) if cancelled => Err(SchedulerError::Cancelled),
            Err(_) => Err(SchedulerError::Abandoned),
        })
    }
}
