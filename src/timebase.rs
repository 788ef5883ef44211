//! Monotonic millisecond clock (C1).
//!
//! Every measurement field, AT command timeout and scheduler due-time in this
//! crate is stamped against this clock rather than wall time, so that a
//! system clock step (NTP sync, SMS-driven `RESTART`, ...) can never make a
//! stale reading look fresh.

use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Milliseconds elapsed since this process's timebase epoch.
///
/// The epoch is fixed at first use; all callers within a process therefore
/// share one monotonic origin. Returned as `i64` (rather than the more
/// obvious `u64`) because [`crate::boatdata`] stamps every field with a
/// sentinel timestamp far in the past to make it read as stale before first
/// write; that sentinel needs headroom on both sides of zero. Wraps are not
/// modeled explicitly (a millisecond counter of this width will not wrap in
/// any deployment lifetime), but the freshness predicate in
/// [`crate::boatdata`] tolerates a future-timestamped observation
/// regardless, per the source firmware's 32-bit-tick-counter wraparound
/// behavior.
pub fn now_ms() -> i64 {
    let epoch = EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_ms_is_monotonic() {
        let a = now_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = now_ms();
        assert!(b >= a);
    }
}
