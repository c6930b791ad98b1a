//! Audit trail of task lifecycle transitions.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::TaskId;
use crate::util::clock::now_ms;

/// Lifecycle transition recorded for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Accepted into the queue.
    Enqueued,
    /// Refused at submission (queue full or shut down).
    Rejected,
    /// Passed quota and spacing checks; first attempt starting.
    Admitted,
    /// Operation produced a value.
    Succeeded,
    /// Terminal failure delivered to the caller.
    Failed,
    /// Withdrawn by the caller.
    Cancelled,
    /// Dropped from the queue by shutdown.
    Shutdown,
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Related task.
    pub task_id: TaskId,
    /// Caller-supplied label from the task context.
    pub label: String,
    /// External correlation id from the task context, if any.
    pub correlation_id: Option<String>,
    /// Transition taken.
    pub action: AuditAction,
    /// Attempts made so far.
    pub attempts: u32,
    /// Wall-clock milliseconds since the Unix epoch.
    pub at_ms: u128,
    /// Additional context, e.g. the terminal error message.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
///
/// Clones share one bounded buffer, so a test can keep a clone and inspect
/// what the scheduler recorded. A capacity of zero records nothing.
#[derive(Debug, Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events.min(1024)))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Task ids for one action, in recording order.
    pub fn task_ids(&self, action: AuditAction) -> Vec<TaskId> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.action == action)
            .map(|e| e.task_id)
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Helper to build an audit event stamped with the current wall clock.
pub fn build_audit_event(
    task_id: TaskId,
    label: impl Into<String>,
    action: AuditAction,
    attempts: u32,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        task_id,
        label: label.into(),
        correlation_id: None,
        action,
        attempts,
        at_ms: now_ms(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_drops_oldest() {
        let sink = InMemoryAuditSink::new(2);
        let ids: Vec<TaskId> = (0..3).map(|_| TaskId::new()).collect();
        for id in &ids {
            sink.record(build_audit_event(*id, "s", AuditAction::Enqueued, 0, None));
        }
        assert_eq!(sink.task_ids(AuditAction::Enqueued), ids[1..].to_vec());
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let sink = InMemoryAuditSink::new(0);
        sink.record(build_audit_event(TaskId::new(), "s", AuditAction::Enqueued, 0, None));
        sink.record(build_audit_event(TaskId::new(), "s", AuditAction::Admitted, 0, None));
        assert!(sink.events().is_empty());
    }

    #[test]
    fn clones_share_buffer() {
        let sink = InMemoryAuditSink::new(8);
        let observer = sink.clone();
        sink.record(build_audit_event(
            TaskId::new(),
            "overview",
            AuditAction::Failed,
            5,
            Some("retries exhausted".into()),
        ));
        let events = observer.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].label, "overview");
        assert_eq!(events[0].attempts, 5);
    }
}
