//! Wall-clock helpers for diagnostics.
//!
//! Scheduling decisions use `tokio::time::Instant`; these timestamps only
//! appear in audit events and task metadata.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, or 0 if the system clock is before it.
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
