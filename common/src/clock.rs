//! Wall-clock access.
//!
//! Components that stamp wall-clock times depend on the [`Clock`] trait
//! rather than calling [`SystemTime::now`] directly, so tests can substitute
//! [`MockClock`] and control time explicitly.

use std::ops::Add;
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A source of wall-clock time.
pub trait Clock: Send + Sync {
    /// Returns the current wall-clock time.
    fn now(&self) -> SystemTime;

    /// Returns the current wall-clock time as milliseconds since the Unix
    /// epoch.
    fn now_millis(&self) -> i64 {
        self.now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// The real system clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A manually controlled clock for tests.
///
/// Time only moves when [`advance`](MockClock::advance) or
/// [`set_millis`](MockClock::set_millis) is called.
#[derive(Debug)]
pub struct MockClock {
    now: RwLock<SystemTime>,
}

impl Clock for MockClock {
    fn now(&self) -> SystemTime {
        *self.now.read().unwrap()
    }
}

impl MockClock {
    /// Creates a clock frozen at the given time.
    pub fn with_time(time: SystemTime) -> Self {
        Self {
            now: RwLock::new(time),
        }
    }

    /// Creates a clock frozen at the given milliseconds since the Unix epoch.
    pub fn at_millis(millis: u64) -> Self {
        Self::with_time(UNIX_EPOCH + Duration::from_millis(millis))
    }

    /// Moves the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.write().unwrap();
        *now = now.add(duration);
    }

    /// Sets the clock to the given milliseconds since the Unix epoch.
    pub fn set_millis(&self, millis: u64) {
        *self.now.write().unwrap() = UNIX_EPOCH + Duration::from_millis(millis);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::at_millis(0)
    }
}
