//! Common time/period helpers for mpstream_core.

use std::time::Duration;

/// Clamp a millisecond period to the `u32` range the device accepts, minimum 1.
#[inline]
pub fn frame_period_ms(period_ms: u64) -> u32 {
    u32::try_from(period_ms.max(1)).unwrap_or(u32::MAX)
}

/// Period as a `Duration`, minimum 1 ms.
#[inline]
pub fn period(period_ms: u64) -> Duration {
    Duration::from_millis(period_ms.max(1))
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
#[inline]
pub fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Whole microseconds in `d`, saturating at `u64::MAX`.
#[inline]
pub fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}
