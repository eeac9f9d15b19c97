//! Wall-clock abstraction so tests can run against a controlled time.
use std::sync::{Arc, RwLock};

use chrono::{DateTime, TimeDelta, Utc};

/// Supplies the current time to the scheduler and the advert service.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock, backed by system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant, so a test can hand one clone to the
/// scheduler and advance the other.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().expect("clock lock poisoned") = now;
    }

    pub fn advance(&self, delta: TimeDelta) {
        *self.now.write().expect("clock lock poisoned") += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().expect("clock lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 4, 15, 10, 0, 0).unwrap());
        let other = clock.clone();
        clock.advance(TimeDelta::minutes(5));
        assert_eq!(
            other.now(),
            Utc.with_ymd_and_hms(2024, 4, 15, 10, 5, 0).unwrap()
        );
    }
}
