//! Time sources for the scheduler.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::TimeReading;

/// Supplies the current local time, or `None` when no trustworthy time is
/// available.
pub trait Clock {
    fn now(&self) -> Option<TimeReading>;
}

/// Wall-clock time in the local time zone.
///
/// Readings before `not_before` are treated as unavailable, which is what an
/// unsynchronized clock sitting at its power-on default looks like.
#[derive(Debug, Clone)]
pub struct SystemClock {
    not_before: DateTime<Utc>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            not_before: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).single().unwrap_or_default(),
        }
    }

    /// Override the earliest instant considered a valid reading.
    pub fn with_not_before(mut self, not_before: DateTime<Utc>) -> Self {
        self.not_before = not_before;
        self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Option<TimeReading> {
        let now = Local::now();
        if now.with_timezone(&Utc) < self.not_before {
            return None;
        }
        Some(TimeReading::from_datetime(&now))
    }
}

/// A clock whose reading is set by hand. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    reading: Rc<Cell<Option<TimeReading>>>,
}

impl ManualClock {
    pub fn new(reading: Option<TimeReading>) -> Self {
        Self {
            reading: Rc::new(Cell::new(reading)),
        }
    }

    pub fn set(&self, reading: Option<TimeReading>) {
        self.reading.set(reading);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Option<TimeReading> {
        self.reading.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_reads_now() {
        let reading = SystemClock::new().now().expect("system clock should be set");
        assert!(reading.hour <= 23);
        assert!(reading.minute <= 59);
        assert!(reading.weekday <= 6);
        assert!(reading.day_of_year <= 365);
    }

    #[test]
    fn test_system_clock_unavailable_before_floor() {
        let far_future = Utc::now() + chrono::Duration::days(365);
        let clock = SystemClock::new().with_not_before(far_future);
        assert!(clock.now().is_none());
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(None);
        let handle = clock.clone();
        assert!(clock.now().is_none());

        let reading = TimeReading {
            hour: 1,
            minute: 2,
            weekday: 3,
            day_of_year: 4,
            epoch: 5,
        };
        handle.set(Some(reading));
        assert_eq!(clock.now(), Some(reading));
    }
}
