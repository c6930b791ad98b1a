//! Configuration models for throttled schedulers.

pub mod throttle;

pub use throttle::{GatewayConfig, ThrottleConfig, ENV_PREFIX};
