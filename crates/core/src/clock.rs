// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling

use chrono::{DateTime, Local};
use std::time::Instant;

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic time, used for elapsed-time markers.
    fn now(&self) -> Instant;
    /// Wall-clock time, used to stamp build log lines.
    fn wall(&self) -> DateTime<Local>;
}

/// Real system clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::Clock;
    use chrono::{DateTime, Local, TimeZone};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    /// Fake clock for testing with controllable time
    #[derive(Clone)]
    pub struct FakeClock {
        current: Arc<Mutex<Instant>>,
        wall: Arc<Mutex<DateTime<Local>>>,
    }

    impl FakeClock {
        pub fn new() -> Self {
            let wall = Local
                .timestamp_opt(1_767_225_600, 0)
                .single()
                .unwrap_or_else(Local::now);
            Self { current: Arc::new(Mutex::new(Instant::now())), wall: Arc::new(Mutex::new(wall)) }
        }

        /// Advance both clocks by the given duration
        pub fn advance(&self, duration: Duration) {
            *self.current.lock() += duration;
            let mut wall = self.wall.lock();
            if let Ok(delta) = chrono::Duration::from_std(duration) {
                *wall += delta;
            }
        }
    }

    impl Default for FakeClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            *self.current.lock()
        }

        fn wall(&self) -> DateTime<Local> {
            *self.wall.lock()
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeClock;

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
