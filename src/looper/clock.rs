//! Monotonic microsecond clock used for event deadlines.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Microseconds elapsed on the monotonic clock since the first call in this process.
pub fn now_us() -> i64 {
    let epoch = *EPOCH.get_or_init(Instant::now);
    i64::try_from(epoch.elapsed().as_micros()).unwrap_or(i64::MAX)
}

/// Absolute deadline `delay` from now, saturating at `i64::MAX`.
pub(crate) fn deadline_after(delay: Duration) -> i64 {
    let delay_us = i64::try_from(delay.as_micros()).unwrap_or(i64::MAX);
    now_us().saturating_add(delay_us)
}
