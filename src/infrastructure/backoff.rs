//! Reconnect delay calculation.
//!
//! The delay for attempt `n` (0-indexed) is `min(base * 2^n, MAX_RECONNECT_DELAY)`.
//! The attempt counter lives in the connection state machine and is reset on every
//! successful open, so each failure episode restarts the curve from `base`.

use crate::types::MAX_RECONNECT_DELAY;
use std::time::Duration;

/// Delay before reconnect attempt `attempts`, capped at [`MAX_RECONNECT_DELAY`].
pub fn reconnect_delay(attempts: u32, base: Duration) -> Duration {
    reconnect_delay_with_cap(attempts, base, MAX_RECONNECT_DELAY)
}

pub fn reconnect_delay_with_cap(attempts: u32, base: Duration, cap: Duration) -> Duration {
    // 2^31 already overflows any realistic base; saturate instead of wrapping
    let factor = 1u32.checked_shl(attempts).unwrap_or(u32::MAX);
    base.checked_mul(factor).map_or(cap, |delay| delay.min(cap))
}
