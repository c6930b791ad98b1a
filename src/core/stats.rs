//! Scheduler statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time view of scheduler activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Tasks accepted into the queue.
    pub submitted: u64,
    /// Tasks refused at submission.
    pub rejected: u64,
    /// Tasks that passed admission and ran at least one attempt.
    pub admitted: u64,
    /// Tasks resolved with a value.
    pub succeeded: u64,
    /// Tasks resolved with a terminal error.
    pub failed: u64,
    /// Tasks withdrawn by their callers.
    pub cancelled: u64,
    /// Attempts beyond the first, summed over all tasks.
    pub retries: u64,
    /// Tasks currently waiting in the queue.
    pub queued: usize,
    /// Whether the consumer loop is active.
    pub consuming: bool,
    /// Admissions counted in the current quota period.
    pub window_count: u32,
}

/// Internal counters (lock-free atomics).
#[derive(Debug, Default)]
pub(crate) struct SchedulerCounters {
    pub submitted: AtomicU64,
    pub rejected: AtomicU64,
    pub admitted: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub cancelled: AtomicU64,
    pub retries: AtomicU64,
}

impl SchedulerCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, queued: usize, consuming: bool, window_count: u32) -> SchedulerStats {
        SchedulerStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            queued,
            consuming,
            window_count,
        }
    }
}
