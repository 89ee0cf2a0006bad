//! Worker tasks that back the runtime orchestration.
//!
//! The authority worker owns the authoritative world and executes requests,
//! while one requester worker per controlled agent runs detection against its
//! replica and forwards attempts across the link.

mod authority;
mod requester;

use std::time::Duration;

pub use authority::{AuthorityCommand, AuthorityWorker};
pub use requester::{RequesterCommand, RequesterLinks, RequesterWorker};

const FALLBACK_TICK_RATE_HZ: f32 = 30.0;

/// Interval period and step for a tick rate, or `None` when the rate is not
/// finite and positive or its period rounds down to zero.
pub(crate) fn checked_tick_period(tick_rate_hz: f32) -> Option<(Duration, f32)> {
    if !tick_rate_hz.is_finite() || tick_rate_hz <= 0.0 {
        return None;
    }
    let dt = 1.0 / tick_rate_hz;
    let period = Duration::try_from_secs_f32(dt).ok()?;
    (!period.is_zero()).then_some((period, dt))
}

/// Fixed simulation step for a tick rate. Unusable rates fall back to 30 Hz.
pub(crate) fn tick_period(tick_rate_hz: f32) -> (Duration, f32) {
    checked_tick_period(tick_rate_hz).unwrap_or_else(|| {
        let dt = 1.0 / FALLBACK_TICK_RATE_HZ;
        (Duration::from_secs_f32(dt), dt)
    })
}
