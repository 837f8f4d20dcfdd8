//! Pluggable time source.
//!
//! Rule conditions never call `Utc::now()` directly; they read the session
//! clock so the same rules run against wall-clock time in production and a
//! manually-advanced clock in tests.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Time source for rule evaluation
pub trait Clock: Send + Sync + 'static {
    /// Current time according to this clock
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time source used in production
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually-advanced clock for deterministic tests
pub struct PseudoClock {
    now: Mutex<DateTime<Utc>>,
}

impl PseudoClock {
    /// Create a pseudo clock starting at the given instant
    pub fn starting_at(epoch: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(epoch),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock();
        *now += duration;
    }

    /// Jump the clock to an absolute instant
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }
}

impl Clock for PseudoClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
