//! Time sources for entry timestamps.
//!
//! Timestamps are persisted as Unix milliseconds, so everything handed out by
//! the history is truncated to millisecond precision up front; what is stored
//! is exactly what is read back.

use std::sync::atomic::{AtomicI64, Ordering};
use time::UtcDateTime;
use time::error::ComponentRange;

const NANOS_PER_MILLI: i128 = 1_000_000;

/// A source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> UtcDateTime;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;
impl Clock for SystemClock {
    fn now(&self) -> UtcDateTime {
        UtcDateTime::now()
    }
}

/// A clock that only moves when told to.
///
/// Note: do NOT apply `#[cfg(test)]` so that other crates can also use this in
/// their tests.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}
impl ManualClock {
    pub fn new(millis: i64) -> Self {
        Self { millis: AtomicI64::new(millis) }
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}
impl Clock for ManualClock {
    fn now(&self) -> UtcDateTime {
        from_millis(self.millis.load(Ordering::SeqCst)).unwrap_or(UtcDateTime::UNIX_EPOCH)
    }
}

pub fn to_millis(time: UtcDateTime) -> i64 {
    (time.unix_timestamp_nanos() / NANOS_PER_MILLI) as i64
}

pub fn from_millis(millis: i64) -> Result<UtcDateTime, ComponentRange> {
    UtcDateTime::from_unix_timestamp_nanos(i128::from(millis) * NANOS_PER_MILLI)
}

pub(crate) fn truncate_to_millis(time: UtcDateTime) -> UtcDateTime {
    from_millis(to_millis(time)).unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_round_trip() {
        let time = from_millis(1_712_345_678_901).unwrap();
        assert_eq!(to_millis(time), 1_712_345_678_901);
        assert_eq!(time.year(), 2024);
    }

    #[test]
    fn truncation_drops_sub_millisecond_precision() {
        let time = UtcDateTime::from_unix_timestamp_nanos(1_000_000_123_456_789).unwrap();
        assert_eq!(truncate_to_millis(time), from_millis(1_000_000_123).unwrap());
    }

    #[test]
    fn manual_clock_moves_on_demand() {
        let clock = ManualClock::new(1_000);
        assert_eq!(to_millis(clock.now()), 1_000);
        clock.advance(500);
        assert_eq!(to_millis(clock.now()), 1_500);
        clock.set(10);
        assert_eq!(to_millis(clock.now()), 10);
    }
}
