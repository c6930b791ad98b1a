//! Admission window: per-period quota and minimum spacing bookkeeping.
//!
//! Single-writer state. Only the scheduler's consumer loop reads or mutates
//! an `AdmissionWindow`; every method takes the current instant explicitly so
//! the arithmetic stays independent of the clock source.

use std::time::Duration;

use tokio::time::Instant;

/// Tunable admission limits, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionLimits {
    /// Length of the quota period.
    pub period: Duration,
    /// Admissions allowed per period.
    pub max_per_period: u32,
    /// Minimum spacing between consecutive admissions.
    pub min_interval: Duration,
}

impl Default for AdmissionLimits {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(60),
            max_per_period: 15,
            min_interval: Duration::from_millis(2_000),
        }
    }
}

/// Quota counter, window reset time and last admission time.
#[derive(Debug, Clone)]
pub struct AdmissionWindow {
    limits: AdmissionLimits,
    count: u32,
    window_reset_at: Instant,
    last_admission_at: Option<Instant>,
}

impl AdmissionWindow {
    /// Start a fresh window at `now`.
    pub fn new(limits: AdmissionLimits, now: Instant) -> Self {
        Self {
            limits,
            count: 0,
            window_reset_at: now + limits.period,
            last_admission_at: None,
        }
    }

    /// Reset the counter if the current period has elapsed.
    ///
    /// Returns `true` when a reset happened.
    pub fn roll(&mut self, now: Instant) -> bool {
        if now > self.window_reset_at {
            self.reset_period(now);
            true
        } else {
            false
        }
    }

    /// Time left until the period resets, if the quota is used up.
    pub fn quota_wait(&self, now: Instant) -> Option<Duration> {
        (self.count >= self.limits.max_per_period)
            .then(|| self.window_reset_at.saturating_duration_since(now))
    }

    /// Begin a new period at `now`.
    pub fn reset_period(&mut self, now: Instant) {
        self.count = 0;
        self.window_reset_at = now + self.limits.period;
    }

    /// Remaining spacing before the next admission may start.
    pub fn spacing_wait(&self, now: Instant) -> Option<Duration> {
        let last = self.last_admission_at?;
        let since_last = now.saturating_duration_since(last);
        (since_last < self.limits.min_interval).then(|| self.limits.min_interval - since_last)
    }

    /// Record that an admission finished at `now`.
    pub fn record_admission(&mut self, now: Instant) {
        self.last_admission_at = Some(now);
        self.count = self.count.saturating_add(1);
    }

    /// Admissions counted in the current period.
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// When the current period ends.
    pub const fn window_reset_at(&self) -> Instant {
        self.window_reset_at
    }

    /// When the most recent admission was recorded.
    pub const fn last_admission_at(&self) -> Option<Instant> {
        self.last_admission_at
    }

    /// Configured limits.
    pub const fn limits(&self) -> AdmissionLimits {
        self.limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(max: u32) -> AdmissionLimits {
        AdmissionLimits {
            period: Duration::from_secs(60),
            max_per_period: max,
            min_interval: Duration::from_secs(2),
        }
    }

    #[test]
    fn fresh_window_admits_immediately() {
        let t0 = Instant::now();
        let w = AdmissionWindow::new(limits(3), t0);
        assert_eq!(w.count(), 0);
        assert_eq!(w.window_reset_at(), t0 + Duration::from_secs(60));
        assert_eq!(w.quota_wait(t0), None);
        assert_eq!(w.spacing_wait(t0), None);
    }

    #[test]
    fn spacing_measured_from_last_admission() {
        let t0 = Instant::now();
        let mut w = AdmissionWindow::new(limits(3), t0);
        w.record_admission(t0);
        assert_eq!(w.spacing_wait(t0), Some(Duration::from_secs(2)));
        assert_eq!(
            w.spacing_wait(t0 + Duration::from_millis(500)),
            Some(Duration::from_millis(1_500))
        );
        assert_eq!(w.spacing_wait(t0 + Duration::from_secs(2)), None);
    }

    #[test]
    fn quota_exhaustion_waits_until_reset() {
        let t0 = Instant::now();
        let mut w = AdmissionWindow::new(limits(2), t0);
        w.record_admission(t0);
        w.record_admission(t0 + Duration::from_secs(2));
        let now = t0 + Duration::from_secs(4);
        assert_eq!(w.quota_wait(now), Some(Duration::from_secs(56)));

        w.reset_period(t0 + Duration::from_secs(60));
        assert_eq!(w.count(), 0);
        assert_eq!(w.window_reset_at(), t0 + Duration::from_secs(120));
    }

    #[test]
    fn roll_only_after_period_elapsed() {
        let t0 = Instant::now();
        let mut w = AdmissionWindow::new(limits(2), t0);
        w.record_admission(t0);
        assert!(!w.roll(t0 + Duration::from_secs(60)));
        assert_eq!(w.count(), 1);
        assert!(w.roll(t0 + Duration::from_secs(61)));
        assert_eq!(w.count(), 0);
        assert_eq!(w.window_reset_at(), t0 + Duration::from_secs(121));
        // Spacing memory survives a period reset.
        assert!(w.last_admission_at().is_some());
    }
}
