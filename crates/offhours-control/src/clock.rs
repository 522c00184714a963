//! Wall-clock source for sequences and the scheduler.

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "test-utils"))]
mod manual {
    use super::Clock;
    use chrono::{DateTime, TimeDelta, Utc};
    use parking_lot::Mutex;

    /// A clock that only moves when told to.
    ///
    /// With a step configured, every `now()` call returns the current value
    /// and then advances it, which lets a polling loop walk through a day.
    #[derive(Debug)]
    pub struct ManualClock {
        inner: Mutex<(DateTime<Utc>, TimeDelta)>,
    }

    impl ManualClock {
        /// A clock fixed at `at`.
        #[must_use]
        pub fn new(at: DateTime<Utc>) -> Self {
            Self::stepping(at, TimeDelta::zero())
        }

        /// A clock that advances by `step` after every read.
        #[must_use]
        pub fn stepping(at: DateTime<Utc>, step: TimeDelta) -> Self {
            Self {
                inner: Mutex::new((at, step)),
            }
        }

        /// Move the clock to `at`.
        pub fn set(&self, at: DateTime<Utc>) {
            self.inner.lock().0 = at;
        }

        /// Advance the clock by `delta`.
        pub fn advance(&self, delta: TimeDelta) {
            self.inner.lock().0 += delta;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            let mut inner = self.inner.lock();
            let (now, step) = *inner;
            inner.0 = now + step;
            now
        }
    }
}
