//! Test utilities for the walkmap crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled when running tests or
//! with the `test-support` feature.

pub mod clock {
    //! Manually advanced clock for lock-window and animation tests.

    use std::sync::{Mutex, MutexGuard};
    use std::time::Duration;

    use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
    use mockable::Clock;

    /// [`Clock`] that only moves when a test advances it.
    pub struct MutableClock(Mutex<DateTime<Utc>>);

    impl MutableClock {
        /// Clock frozen at `now`.
        #[must_use]
        pub fn new(now: DateTime<Utc>) -> Self {
            Self(Mutex::new(now))
        }

        /// Clock frozen at a fixed morning instant.
        ///
        /// # Panics
        ///
        /// Never in practice; the instant is a valid UTC date.
        #[must_use]
        pub fn at_epoch() -> Self {
            match Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).single() {
                Some(now) => Self::new(now),
                None => panic!("fixed test instant should be unambiguous"),
            }
        }

        /// Move the clock forward by `delta`.
        ///
        /// # Panics
        ///
        /// Panics when `delta` does not fit a [`TimeDelta`].
        pub fn advance(&self, delta: Duration) {
            let step = match TimeDelta::from_std(delta) {
                Ok(step) => step,
                Err(error) => {
                    panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}")
                }
            };
            *self.lock_clock() += step;
        }

        /// Move the clock forward by `millis` milliseconds.
        pub fn advance_millis(&self, millis: u64) {
            self.advance(Duration::from_millis(millis));
        }

        fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
            match self.0.lock() {
                Ok(guard) => guard,
                Err(_) => panic!("clock mutex"),
            }
        }
    }

    impl Clock for MutableClock {
        fn local(&self) -> DateTime<Local> {
            self.utc().with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            *self.lock_clock()
        }
    }
}

pub mod map_engine;
pub mod sources;
