//! Admission-controlled scheduler: a FIFO queue drained by one consumer loop.
//!
//! Callers [`Scheduler::submit`] operations from any task or thread. The
//! first submission onto an idle scheduler spawns the consumer, which, for
//! each queued task in arrival order:
//!
//! 1. rolls the quota period over if it has elapsed,
//! 2. waits for the period to end if the quota is spent,
//! 3. waits out the minimum spacing since the previous admission,
//! 4. pops the head task and runs it through the [`RetryExecutor`],
//! 5. records the admission and resolves the caller's handle.
//!
//! The consumer exits when the queue is empty; the next submission starts a
//! new one. Operations never run concurrently within one scheduler, which is
//! what keeps the window arithmetic free of races.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::core::audit::{build_audit_event, AuditAction, AuditSink};
use crate::core::backoff::BackoffPolicy;
use crate::core::retry::RetryExecutor;
use crate::core::stats::{SchedulerCounters, SchedulerStats};
use crate::core::task::{Task, TaskContext, TaskHandle, TaskId, TaskOutcome};
use crate::core::window::{AdmissionLimits, AdmissionWindow};
use crate::core::{Operation, SchedulerError};
use crate::infra::queue::FifoQueue;
use crate::util::clock::now_ms;

/// Abstraction for spawning the consumer loop on a runtime.
pub trait Spawn {
    /// Spawn a detached future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Configuration values for admission, retry and queueing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerLimits {
    /// Quota and spacing.
    pub admission: AdmissionLimits,
    /// Retry budget and backoff.
    pub backoff: BackoffPolicy,
    /// Queue bound; `None` leaves it unbounded.
    pub max_queue_depth: Option<usize>,
}

struct QueueState<T> {
    queue: FifoQueue<Task<T>>,
    /// Non-reentrancy flag: at most one consumer loop per scheduler.
    consuming: bool,
    shutdown: bool,
}

struct Shared<T> {
    name: String,
    limits: SchedulerLimits,
    retry: RetryExecutor,
    state: Mutex<QueueState<T>>,
    /// Consumer-only. Locked briefly so `Shared` can be `Sync`.
    window: Mutex<AdmissionWindow>,
    counters: SchedulerCounters,
    audit: Option<Arc<dyn AuditSink>>,
}

/// Rate-limited, retrying, strictly sequential task scheduler.
///
/// Cheap to clone; clones share the queue, window and consumer.
pub struct Scheduler<T, S> {
    shared: Arc<Shared<T>>,
    spawner: S,
}

impl<T, S: Clone> Clone for Scheduler<T, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            spawner: self.spawner.clone(),
        }
    }
}

impl<T, S> Scheduler<T, S>
where
    T: Send + 'static,
    S: Spawn,
{
    /// Create a scheduler. The quota period starts now.
    pub fn new(name: impl Into<String>, limits: SchedulerLimits, spawner: S) -> Self {
        Self::from_parts(name.into(), limits, spawner, None)
    }

    /// Create a scheduler that reports lifecycle transitions to `audit`.
    pub fn with_audit_sink(
        name: impl Into<String>,
        limits: SchedulerLimits,
        spawner: S,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self::from_parts(name.into(), limits, spawner, Some(audit))
    }

    fn from_parts(
        name: String,
        limits: SchedulerLimits,
        spawner: S,
        audit: Option<Arc<dyn AuditSink>>,
    ) -> Self {
        let shared = Shared {
            name,
            limits,
            retry: RetryExecutor::new(limits.backoff),
            state: Mutex::new(QueueState {
                queue: FifoQueue::new(limits.max_queue_depth),
                consuming: false,
                shutdown: false,
            }),
            window: Mutex::new(AdmissionWindow::new(limits.admission, Instant::now())),
            counters: SchedulerCounters::default(),
            audit,
        };
        Self {
            shared: Arc::new(shared),
            spawner,
        }
    }

    /// Queue `operation` behind every earlier submission.
    ///
    /// Returns immediately; await the handle for the outcome. Starts the
    /// consumer loop if it is idle.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::QueueFull`] when a bounded queue is at capacity,
    /// [`SchedulerError::Shutdown`] after [`Scheduler::shutdown`].
    pub fn submit<O>(&self, operation: O, context: TaskContext) -> Result<TaskHandle<T>, SchedulerError>
    where
        O: Operation<T> + 'static,
    {
        let id = TaskId::new();
        let (tx, rx) = oneshot::channel();
        let task = Task {
            id,
            operation: Box::new(operation),
            context,
            attempts: 0,
            created_at: Instant::now(),
            created_at_ms: now_ms(),
            outcome: tx,
        };

        let shared = &self.shared;
        let start_consumer = {
            let mut state = shared.state.lock();
            if state.shutdown {
                drop(state);
                shared.reject(&task, &SchedulerError::Shutdown);
                return Err(SchedulerError::Shutdown);
            }
            let context = task.context.clone();
            let pushed = state.queue.push(task);
            if let Err((err, task)) = pushed {
                drop(state);
                shared.reject(&task, &err);
                return Err(err);
            }
            // Recorded under the queue lock so it precedes the admission event.
            shared.record(id, &context, AuditAction::Enqueued, 0, None);
            debug!(
                scheduler = %shared.name,
                task_id = %id,
                label = %context.label,
                depth = state.queue.len(),
                "task enqueued"
            );
            !std::mem::replace(&mut state.consuming, true)
        };
        SchedulerCounters::bump(&shared.counters.submitted);

        if start_consumer {
            debug!(scheduler = %shared.name, "starting consumer");
            self.spawner.spawn(consume(Arc::clone(shared)));
        }
        Ok(TaskHandle::new(id, rx))
    }

    /// Submit and wait for the outcome.
    ///
    /// # Errors
    ///
    /// Any submission error, or the task's terminal error.
    pub async fn run<O>(&self, operation: O, context: TaskContext) -> TaskOutcome<T>
    where
        O: Operation<T> + 'static,
    {
        self.submit(operation, context)?.await
    }
}

impl<T, S> Scheduler<T, S> {
    /// Stop accepting work and resolve every queued task with
    /// [`SchedulerError::Shutdown`]. A task already running finishes normally.
    pub fn shutdown(&self) {
        let shared = &self.shared;
        let drained = {
            let mut state = shared.state.lock();
            state.shutdown = true;
            state.queue.drain()
        };
        info!(scheduler = %shared.name, dropped = drained.len(), "scheduler shutting down");
        for task in drained {
            shared.record(task.id, &task.context, AuditAction::Shutdown, 0, None);
            task.resolve(Err(SchedulerError::Shutdown));
        }
    }

    /// Whether [`Scheduler::shutdown`] has been called.
    pub fn is_shutdown(&self) -> bool {
        self.shared.state.lock().shutdown
    }

    /// Current statistics.
    pub fn stats(&self) -> SchedulerStats {
        let (queued, consuming) = {
            let state = self.shared.state.lock();
            (state.queue.len(), state.consuming)
        };
        let window_count = self.shared.window.lock().count();
        self.shared.counters.snapshot(queued, consuming, window_count)
    }

    /// Scheduler name used in logs.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Configured limits.
    pub fn limits(&self) -> SchedulerLimits {
        self.shared.limits
    }
}

/// Clears the consumer flag if the loop dies without draining the queue.
/// Operation panics are caught in `run_task`; this covers the rest, e.g. a
/// panicking audit sink.
struct ConsumerGuard<'a, T> {
    shared: &'a Shared<T>,
    armed: bool,
}

impl<T> Drop for ConsumerGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let pending = {
            let mut state = self.shared.state.lock();
            state.consuming = false;
            state.queue.len()
        };
        error!(
            scheduler = %self.shared.name,
            pending,
            "consumer stopped unexpectedly; the next submit restarts it"
        );
    }
}

async fn consume<T: Send + 'static>(shared: Arc<Shared<T>>) {
    let mut guard = ConsumerGuard {
        shared: &*shared,
        armed: true,
    };

    while shared.prepare_head() {
        shared.await_admission().await;

        let Some(task) = shared.take_head() else {
            break;
        };
        if task.is_cancelled() {
            shared.withdraw(task);
            continue;
        }
        shared.run_task(task).await;
    }

    guard.armed = false;
    debug!(scheduler = %shared.name, "queue drained, consumer exiting");
}

impl<T: Send + 'static> Shared<T> {
    /// Drop withdrawn tasks at the head. Returns `false`, releasing the
    /// consumer flag, when nothing is left to run.
    fn prepare_head(&self) -> bool {
        let (withdrawn, has_work) = {
            let mut state = self.state.lock();
            let withdrawn = state.queue.pop_while(Task::is_cancelled);
            let has_work = !state.queue.is_empty();
            if !has_work {
                state.consuming = false;
            }
            (withdrawn, has_work)
        };
        for task in withdrawn {
            self.withdraw(task);
        }
        has_work
    }

    fn take_head(&self) -> Option<Task<T>> {
        let mut state = self.state.lock();
        let task = state.queue.pop();
        if task.is_none() {
            state.consuming = false;
        }
        task
    }

    /// Quota and spacing waits, evaluated in queue order.
    async fn await_admission(&self) {
        let quota_wait = {
            let now = Instant::now();
            let mut window = self.window.lock();
            if window.roll(now) {
                debug!(scheduler = %self.name, "quota period rolled over");
            }
            window.quota_wait(now)
        };
        if let Some(wait) = quota_wait {
            info!(
                scheduler = %self.name,
                wait_ms = millis(wait),
                max_per_period = self.limits.admission.max_per_period,
                "quota reached, waiting for period reset"
            );
            tokio::time::sleep(wait).await;
            self.window.lock().reset_period(Instant::now());
        }

        let spacing_wait = self.window.lock().spacing_wait(Instant::now());
        if let Some(wait) = spacing_wait {
            debug!(scheduler = %self.name, wait_ms = millis(wait), "spacing admissions");
            tokio::time::sleep(wait).await;
        }
    }

    async fn run_task(&self, mut task: Task<T>) {
        let admitted_at = Instant::now();
        SchedulerCounters::bump(&self.counters.admitted);
        self.record(task.id, &task.context, AuditAction::Admitted, 0, None);
        info!(
            scheduler = %self.name,
            task_id = %task.id,
            label = %task.context.label,
            correlation_id = ?task.context.correlation_id,
            queued_ms = millis(admitted_at.saturating_duration_since(task.created_at)),
            "task admitted"
        );

        let attempt = self.retry.execute_until(
            task.operation.as_mut(),
            &mut task.attempts,
            task.outcome.closed(),
        );
        let caught = AssertUnwindSafe(attempt).catch_unwind().await;
        let result = match caught {
            Ok(result) => result,
            Err(_) => {
                error!(
                    scheduler = %self.name,
                    task_id = %task.id,
                    label = %task.context.label,
                    attempts = task.attempts,
                    "operation panicked, abandoning task"
                );
                Err(SchedulerError::Abandoned)
            }
        };

        self.window.lock().record_admission(Instant::now());

        let attempts = task.attempts;
        self.counters
            .retries
            .fetch_add(u64::from(attempts.saturating_sub(1)), std::sync::atomic::Ordering::Relaxed);

        match &result {
            Ok(_) => {
                SchedulerCounters::bump(&self.counters.succeeded);
                self.record(task.id, &task.context, AuditAction::Succeeded, attempts, None);
                info!(
                    scheduler = %self.name,
                    task_id = %task.id,
                    attempts,
                    elapsed_ms = millis(admitted_at.elapsed()),
                    "task succeeded"
                );
            }
            Err(SchedulerError::Cancelled) => {
                SchedulerCounters::bump(&self.counters.cancelled);
                self.record(task.id, &task.context, AuditAction::Cancelled, attempts, None);
                debug!(scheduler = %self.name, task_id = %task.id, attempts, "task cancelled during backoff");
            }
            Err(err) => {
                SchedulerCounters::bump(&self.counters.failed);
                self.record(
                    task.id,
                    &task.context,
                    AuditAction::Failed,
                    attempts,
                    Some(err.to_string()),
                );
                warn!(
                    scheduler = %self.name,
                    task_id = %task.id,
                    label = %task.context.label,
                    correlation_id = ?task.context.correlation_id,
                    attempts,
                    error = %err,
                    "task failed"
                );
            }
        }

        let id = task.id;
        if !task.resolve(result) {
            debug!(scheduler = %self.name, task_id = %id, "caller dropped handle before outcome");
        }
    }
}

impl<T> Shared<T> {
    fn withdraw(&self, task: Task<T>) {
        SchedulerCounters::bump(&self.counters.cancelled);
        self.record(task.id, &task.context, AuditAction::Cancelled, task.attempts, None);
        debug!(scheduler = %self.name, task_id = %task.id, "withdrawn task dropped before admission");
    }

    fn reject(&self, task: &Task<T>, err: &SchedulerError) {
        SchedulerCounters::bump(&self.counters.rejected);
        self.record(
            task.id,
            &task.context,
            AuditAction::Rejected,
            0,
            Some(err.to_string()),
        );
        warn!(scheduler = %self.name, task_id = %task.id, error = %err, "submission rejected");
    }

    fn record(
        &self,
        id: TaskId,
        context: &TaskContext,
        action: AuditAction,
        attempts: u32,
        detail: Option<String>,
    ) {
        if let Some(sink) = &self.audit {
            let mut event = build_audit_event(id, &context.label, action, attempts, detail);
            event.correlation_id.clone_from(&context.correlation_id);
            sink.record(event);
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
