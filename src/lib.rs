//! # Prometheus Throttle
//!
//! Admission-controlled, retrying task scheduler for calls against
//! rate-limited external services.
//!
//! Callers submit asynchronous operations that each make one outbound
//! request. A [`core::Scheduler`] runs them strictly one at a time, in
//! arrival order, while enforcing:
//!
//! - **Quota**: at most `max_per_period` admissions per rolling period,
//! - **Spacing**: a minimum gap between consecutive admissions,
//! - **Retry**: exponential backoff with jitter for transient and
//!   rate-limit failures, no retry for permanent ones.
//!
//! Each submission returns a [`core::TaskHandle`] that resolves to the
//! operation's value or a [`core::SchedulerError`].
//!
//! ```rust,ignore
//! use prometheus_throttle::core::{OperationError, Scheduler, SchedulerLimits, TaskContext};
//! use prometheus_throttle::runtime::TokioSpawner;
//!
//! let scheduler = Scheduler::new("llm", SchedulerLimits::default(), TokioSpawner::current());
//! let handle = scheduler.submit(
//!     || async { call_model("overview").await.map_err(|e| OperationError::inferred(e.to_string())) },
//!     TaskContext::new("overview"),
//! )?;
//! let text = handle.await?;
//! ```
//!
//! Limits can come from JSON or the environment via [`config::ThrottleConfig`];
//! [`builders::build_schedulers`] creates one scheduler per downstream
//! service from a [`config::GatewayConfig`].

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: admission window, backoff and retry.
pub mod core;
/// Configuration models and loaders.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Infrastructure adapters for queues.
pub mod infra;
/// Runtime adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;
