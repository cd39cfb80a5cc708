//! Source of the current time.
//!
//! Pipeline stages never call [`Utc::now()`] directly, so tests can pin and advance the clock.
use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{Error, Result};

#[allow(missing_docs)]
pub type Timestamp = DateTime<Utc>;

/// `timestamp + duration_millis`, failing instead of overflowing on durations read from the
/// workspace. Negative durations move the timestamp back.
pub(crate) fn add_millis(timestamp: Timestamp, duration_millis: i64) -> Result<Timestamp> {
    TimeDelta::try_milliseconds(duration_millis)
        .and_then(|delta| timestamp.checked_add_signed(delta))
        .ok_or(Error::DurationOutOfRange { duration_millis })
}

/// Provides the current time.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> Timestamp;
}

/// [`Clock`] backed by the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Clock that only moves when told to. Useful for tests of code scheduling in-app messages.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    /// Create a clock pinned at `now`.
    pub fn new(now: Timestamp) -> ManualClock {
        ManualClock {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: Timestamp) {
        *self.now.lock().expect("thread holding clock lock should not panic") = now;
    }

    /// Move the clock forward by `millis` milliseconds.
    pub fn advance_millis(&self, millis: i64) {
        let mut now = self.now.lock().expect("thread holding clock lock should not panic");
        *now += chrono::Duration::milliseconds(millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().expect("thread holding clock lock should not panic")
    }
}
