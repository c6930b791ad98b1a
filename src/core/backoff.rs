//! Error classification and backoff delay computation.
//!
//! Pure functions only: no clocks, no I/O. The retry executor owns the
//! sleeping; this module only answers "retry?" and "how long?".

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Retry classification of an operation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Quota exceeded (429, "rate limit", "quota").
    RateLimited,
    /// Bad gateway, service unavailable, gateway timeout or a plain timeout.
    TransientService,
    /// Anything else. Never retried.
    Permanent,
}

impl ErrorKind {
    /// Whether a failure of this kind may be retried.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::TransientService)
    }

    /// Classify an HTTP status code.
    pub const fn from_http_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            408 | 502 | 503 | 504 => Self::TransientService,
            _ => Self::Permanent,
        }
    }

    /// Best-effort classification from free-form error text.
    pub fn infer_from_message(message: &str) -> Self {
        const RATE_LIMIT_MARKERS: [&str; 5] =
            ["429", "rate limit", "ratelimit", "quota", "too many requests"];
        const TRANSIENT_MARKERS: [&str; 8] = [
            "502",
            "503",
            "504",
            "bad gateway",
            "service unavailable",
            "gateway timeout",
            "timeout",
            "timed out",
        ];

        let text = message.to_ascii_lowercase();
        if RATE_LIMIT_MARKERS.iter().any(|m| text.contains(m)) {
            Self::RateLimited
        } else if TRANSIENT_MARKERS.iter().any(|m| text.contains(m)) {
            Self::TransientService
        } else {
            Self::Permanent
        }
    }
}

/// Decision returned by the backoff policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Attempt budget is spent.
    Exhausted,
    /// Failure is permanent; surface it now.
    GiveUp,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff with jitter, a cap and a rate-limit floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Maximum number of attempts, including the first.
    pub max_retries: u32,
    /// Delay before the second attempt, before jitter.
    pub base_delay: Duration,
    /// Upper bound on `base * 2^(k-1) + jitter`.
    pub max_delay: Duration,
    /// Minimum delay after a rate-limited failure. Applied after the cap.
    pub rate_limit_floor: Duration,
    /// Upper bound of the uniform jitter added to each delay.
    pub jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(30_000),
            rate_limit_floor: Duration::from_millis(10_000),
            jitter: Duration::from_millis(1_000),
        }
    }
}

impl BackoffPolicy {
    /// Decide what to do after attempt `attempt` (1-based) failed with `kind`.
    ///
    /// Exhaustion is checked before classification, so the final permitted
    /// attempt always ends in [`RetryDecision::Exhausted`].
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_retries {
            return RetryDecision::Exhausted;
        }
        if !kind.is_retryable() {
            return RetryDecision::GiveUp;
        }
        RetryDecision::RetryAfter(self.delay_for(attempt, kind))
    }

    /// `base_delay * 2^(attempt-1)`, saturating.
    pub fn exponential(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Delay for `attempt` with a caller-chosen jitter value.
    pub fn delay_with_jitter(&self, attempt: u32, kind: ErrorKind, jitter: Duration) -> Duration {
        let delay = self
            .exponential(attempt)
            .saturating_add(jitter)
            .min(self.max_delay);
        if kind == ErrorKind::RateLimited {
            delay.max(self.rate_limit_floor)
        } else {
            delay
        }
    }

    /// Delay for `attempt` with uniform random jitter in `[0, jitter]`.
    pub fn delay_for(&self, attempt: u32, kind: ErrorKind) -> Duration {
        self.delay_with_jitter(attempt, kind, self.sample_jitter())
    }

    fn sample_jitter(&self) -> Duration {
        let ceiling = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::rng().random_range(0..=ceiling))
    }
}
