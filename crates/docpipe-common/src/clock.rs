//! Clock capability for deterministic time in tests
//!
//! Components take an `Arc<dyn Clock>` instead of calling `Utc::now()`
//! directly so tests can pin and advance time.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

/// Source of the current wall-clock time
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests
///
/// Starts at a fixed instant and only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock pinned to the given instant
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Create a clock pinned to an arbitrary but fixed epoch
    ///
    /// # Panics
    ///
    /// Never panics; the epoch is a valid timestamp.
    #[allow(clippy::unwrap_used)]
    pub fn epoch() -> Self {
        Self::new(Utc.timestamp_opt(1_700_000_000, 0).single().unwrap())
    }

    /// Advance the clock by `delta`
    #[allow(clippy::unwrap_used)]
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::TimeDelta::from_std(delta).unwrap_or(chrono::TimeDelta::zero());
    }

    /// Pin the clock to an exact instant
    #[allow(clippy::unwrap_used)]
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap() = instant;
    }
}

impl Clock for ManualClock {
    #[allow(clippy::unwrap_used)]
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_only_moves_when_advanced() {
        let clock = ManualClock::epoch();
        let t0 = clock.now();
        assert_eq!(t0, clock.now());

        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.now() - t0, chrono::TimeDelta::seconds(90));
    }
}
