//! Builders to construct schedulers from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::config::{GatewayConfig, ThrottleConfig};
use crate::core::{AuditSink, Scheduler, SchedulerError, Spawn};

/// Fluent construction of one [`Scheduler`].
pub struct SchedulerBuilder<S> {
    name: String,
    config: ThrottleConfig,
    audit: Option<Arc<dyn AuditSink>>,
    spawner: S,
}

impl<S: Spawn> SchedulerBuilder<S> {
    /// Start from default limits.
    pub fn new(name: impl Into<String>, spawner: S) -> Self {
        Self {
            name: name.into(),
            config: ThrottleConfig::default(),
            audit: None,
            spawner,
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn config(mut self, config: ThrottleConfig) -> Self {
        self.config = config;
        self
    }

    /// Report lifecycle transitions to `sink`.
    #[must_use]
    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Scheduler name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration the scheduler will be built with.
    pub const fn throttle_config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Validate the configuration and build.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidConfig`] if validation fails.
    pub fn build<T: Send + 'static>(self) -> Result<Scheduler<T, S>, SchedulerError> {
        self.config
            .validate()
            .map_err(|e| SchedulerError::InvalidConfig(format!("scheduler `{}`: {e}", self.name)))?;
        let limits = self.config.limits();
        info!(
            scheduler = %self.name,
            max_per_period = limits.admission.max_per_period,
            period_ms = self.config.period_ms,
            min_interval_ms = self.config.min_interval_ms,
            max_retries = limits.backoff.max_retries,
            "building scheduler"
        );
        Ok(match self.audit {
            Some(sink) => Scheduler::with_audit_sink(self.name, limits, self.spawner, sink),
            None => Scheduler::new(self.name, limits, self.spawner),
        })
    }
}

/// Build one scheduler per entry of `cfg`, all sharing `spawner`.
///
/// # Errors
///
/// [`SchedulerError::InvalidConfig`] if the gateway configuration is invalid.
pub fn build_schedulers<T, S>(
    cfg: &GatewayConfig,
    spawner: S,
) -> Result<HashMap<String, Scheduler<T, S>>, SchedulerError>
where
    T: Send + 'static,
    S: Spawn + Clone,
{
    cfg.validate().map_err(SchedulerError::InvalidConfig)?;

    let mut schedulers = HashMap::with_capacity(cfg.schedulers.len());
    for (name, throttle) in &cfg.schedulers {
        let scheduler = SchedulerBuilder::new(name.clone(), spawner.clone())
            .config(throttle.clone())
            .build()?;
        schedulers.insert(name.clone(), scheduler);
    }
    Ok(schedulers)
}
