// Time Provider Port (for testability)

use chrono::{Datelike, NaiveDateTime, Timelike};

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Current local wall-clock time
    fn now(&self) -> NaiveDateTime;

    /// Calendar year used to scope new recruitment ids
    fn current_year(&self) -> i32 {
        self.now().year()
    }
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> NaiveDateTime {
        // Seconds precision, matches the stored timestamp format
        let now = chrono::Local::now().naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }
}

/// Fixed clock (tests)
pub struct FixedTimeProvider(pub NaiveDateTime);

impl TimeProvider for FixedTimeProvider {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
