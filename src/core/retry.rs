//! Retry executor: runs one operation until success, a permanent failure or
//! attempt exhaustion.

use std::future::{self, Future};

use tracing::{debug, warn};

use super::backoff::{BackoffPolicy, RetryDecision};
use super::{Operation, SchedulerError};

/// Drives a single operation through its attempts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor {
    policy: BackoffPolicy,
}

impl RetryExecutor {
    /// Create an executor with the given backoff policy.
    pub const fn new(policy: BackoffPolicy) -> Self {
        Self { policy }
    }

    /// Backoff policy in use.
    pub const fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Run `operation` with retries.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Operation`] for a permanent failure (after one
    /// attempt), [`SchedulerError::RetriesExhausted`] once `max_retries`
    /// attempts have failed.
    pub async fn execute<T, O>(&self, operation: &mut O) -> Result<T, SchedulerError>
    where
        O: Operation<T> + ?Sized,
    {
        let mut attempts = 0;
        self.execute_until(operation, &mut attempts, future::pending())
            .await
    }

    /// Run `operation` with retries, abandoning a backoff wait when `cancel`
    /// completes.
    ///
    /// `attempts` is incremented once per attempt and keeps its value when
    /// this returns, whatever the outcome. An attempt already running is
    /// never interrupted.
    ///
    /// # Errors
    ///
    /// As [`RetryExecutor::execute`], plus [`SchedulerError::Cancelled`] when
    /// `cancel` fires during a backoff wait.
    pub async fn execute_until<T, O, C>(
        &self,
        operation: &mut O,
        attempts: &mut u32,
        cancel: C,
    ) -> Result<T, SchedulerError>
    where
        O: Operation<T> + ?Sized,
        C: Future<Output = ()>,
    {
        tokio::pin!(cancel);

        loop {
            *attempts += 1;
            let attempt = *attempts;

            let err = match operation.run().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            let kind = err.kind();
            match self.policy.decide(attempt, kind) {
                RetryDecision::Exhausted => {
                    warn!(attempt, ?kind, error = %err, "retries exhausted");
                    return Err(SchedulerError::RetriesExhausted {
                        attempts: attempt,
                        last_error: err.to_string(),
                    });
                }
                RetryDecision::GiveUp => {
                    debug!(attempt, error = %err, "permanent failure, not retrying");
                    return Err(err.into());
                }
                RetryDecision::RetryAfter(delay) => {
                    warn!(
                        attempt,
                        ?kind,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "retryable failure, backing off"
                    );
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = &mut cancel => {
                            debug!(attempt, "backoff abandoned, task cancelled");
                            return Err(SchedulerError::Cancelled);
                        }
                    }
                }
            }
        }
    }
}
