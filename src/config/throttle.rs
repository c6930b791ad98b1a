//! Throttle and gateway configuration structures.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{AdmissionLimits, AppResult, BackoffPolicy, SchedulerLimits};

/// Prefix shared by every environment variable read by [`ThrottleConfig::from_env`].
pub const ENV_PREFIX: &str = "THROTTLE_";

/// Limits for one downstream service, in wire-friendly units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Length of one quota period in milliseconds.
    pub period_ms: u64,
    /// Admissions allowed per period.
    pub max_per_period: u32,
    /// Minimum gap between consecutive admissions in milliseconds.
    pub min_interval_ms: u64,
    /// Attempts per task, including the first.
    pub max_retries: u32,
    /// First backoff delay in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds.
    pub max_delay_ms: u64,
    /// Lower bound on the delay after a rate-limit failure.
    pub rate_limit_floor_ms: u64,
    /// Upper bound of the random jitter added to each delay.
    pub jitter_ms: u64,
    /// Queue bound; absent means unbounded.
    pub max_queue_depth: Option<usize>,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        let admission = AdmissionLimits::default();
        let backoff = BackoffPolicy::default();
        Self {
            period_ms: millis(admission.period),
            max_per_period: admission.max_per_period,
            min_interval_ms: millis(admission.min_interval),
            max_retries: backoff.max_retries,
            base_delay_ms: millis(backoff.base_delay),
            max_delay_ms: millis(backoff.max_delay),
            rate_limit_floor_ms: millis(backoff.rate_limit_floor),
            jitter_ms: millis(backoff.jitter),
            max_queue_depth: None,
        }
    }
}

impl ThrottleConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// A message naming the first offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.period_ms == 0 {
            return Err("period_ms must be greater than 0".into());
        }
        if self.max_per_period == 0 {
            return Err("max_per_period must be greater than 0".into());
        }
        if self.max_retries == 0 {
            return Err("max_retries must be greater than 0".into());
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(format!(
                "base_delay_ms ({}) must not exceed max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            ));
        }
        if self.max_queue_depth == Some(0) {
            return Err("max_queue_depth must be greater than 0 when set".into());
        }
        Ok(())
    }

    /// Parse from a JSON string and validate. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and parse a JSON file.
    ///
    /// # Errors
    ///
    /// I/O, parse or validation failure, with the path attached.
    pub fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading throttle config {}", path.display()))?;
        Self::from_json_str(&raw)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("loading throttle config {}", path.display()))
    }

    /// Defaults overridden by `THROTTLE_*` environment variables, after
    /// loading a `.env` file if one exists.
    ///
    /// Recognised: `THROTTLE_PERIOD_MS`, `THROTTLE_MAX_PER_PERIOD`,
    /// `THROTTLE_MIN_INTERVAL_MS`, `THROTTLE_MAX_RETRIES`,
    /// `THROTTLE_BASE_DELAY_MS`, `THROTTLE_MAX_DELAY_MS`,
    /// `THROTTLE_RATE_LIMIT_FLOOR_MS`, `THROTTLE_JITTER_MS`,
    /// `THROTTLE_MAX_QUEUE_DEPTH`.
    ///
    /// # Errors
    ///
    /// A variable that does not parse, or a resulting config that fails
    /// validation.
    pub fn from_env() -> AppResult<Self> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `THROTTLE_*` key.
    ///
    /// # Errors
    ///
    /// As [`ThrottleConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut cfg = Self::default();
        override_from(&lookup, "PERIOD_MS", &mut cfg.period_ms)?;
        override_from(&lookup, "MAX_PER_PERIOD", &mut cfg.max_per_period)?;
        override_from(&lookup, "MIN_INTERVAL_MS", &mut cfg.min_interval_ms)?;
        override_from(&lookup, "MAX_RETRIES", &mut cfg.max_retries)?;
        override_from(&lookup, "BASE_DELAY_MS", &mut cfg.base_delay_ms)?;
        override_from(&lookup, "MAX_DELAY_MS", &mut cfg.max_delay_ms)?;
        override_from(&lookup, "RATE_LIMIT_FLOOR_MS", &mut cfg.rate_limit_floor_ms)?;
        override_from(&lookup, "JITTER_MS", &mut cfg.jitter_ms)?;
        let mut depth = 0usize;
        if override_from(&lookup, "MAX_QUEUE_DEPTH", &mut depth)? {
            cfg.max_queue_depth = Some(depth);
        }
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }

    /// Quota and spacing limits.
    pub const fn admission_limits(&self) -> AdmissionLimits {
        AdmissionLimits {
            period: Duration::from_millis(self.period_ms),
            max_per_period: self.max_per_period,
            min_interval: Duration::from_millis(self.min_interval_ms),
        }
    }

    /// Retry budget and delays.
    pub const fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            rate_limit_floor: Duration::from_millis(self.rate_limit_floor_ms),
            jitter: Duration::from_millis(self.jitter_ms),
        }
    }

    /// Everything a [`crate::core::Scheduler`] needs.
    pub const fn limits(&self) -> SchedulerLimits {
        SchedulerLimits {
            admission: self.admission_limits(),
            backoff: self.backoff_policy(),
            max_queue_depth: self.max_queue_depth,
        }
    }
}

/// One throttle per downstream service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Map of scheduler name to configuration.
    pub schedulers: HashMap<String, ThrottleConfig>,
}

impl GatewayConfig {
    /// Validate all schedulers and ensure at least one exists.
    ///
    /// # Errors
    ///
    /// A message naming the offending scheduler.
    pub fn validate(&self) -> Result<(), String> {
        if self.schedulers.is_empty() {
            return Err("at least one scheduler must be defined".into());
        }
        for (name, cfg) in &self.schedulers {
            cfg.validate()
                .map_err(|e| format!("scheduler `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse gateway configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

fn override_from<V>(
    lookup: &impl Fn(&str) -> Option<String>,
    suffix: &str,
    target: &mut V,
) -> AppResult<bool>
where
    V: FromStr,
    V::Err: std::error::Error + Send + Sync + 'static,
{
    let key = format!("{ENV_PREFIX}{suffix}");
    let Some(raw) = lookup(&key) else {
        return Ok(false);
    };
    *target = raw
        .trim()
        .parse()
        .with_context(|| format!("{key}={raw:?} is not a valid value"))?;
    Ok(true)
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
