//! Camera transition guard.
//!
//! While the camera flies to a new search centre the guard is `Locked`; new
//! search results are refused (or parked, under [`ReentryPolicy::ReplayLatest`])
//! until a settle event observes that the configured fly duration has elapsed.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::Coordinate;

/// What to do with a search that arrives while the camera is locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReentryPolicy {
    /// Ignore it.
    #[default]
    Drop,
    /// Keep the most recent one and run it once the camera settles.
    ReplayLatest,
}

/// Error returned when parsing an unknown re-entry policy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown re-entry policy `{0}` (expected `drop` or `replay-latest`)")]
pub struct ParseReentryPolicyError(String);

impl FromStr for ReentryPolicy {
    type Err = ParseReentryPolicyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "replay-latest" | "replay_latest" => Ok(Self::ReplayLatest),
            other => Err(ParseReentryPolicyError(other.to_owned())),
        }
    }
}

/// Lock state of the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionState {
    /// No camera move in progress; input is enabled.
    Idle,
    /// A fly-to started at `started_at`; input is disabled.
    Locked {
        /// Instant the lock was taken.
        started_at: DateTime<Utc>,
    },
}

/// Decision for an incoming search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The guard locked and the search may proceed.
    Accepted,
    /// The guard was locked; the search was dropped.
    Rejected,
    /// The guard was locked; the search was parked for replay.
    Deferred,
}

/// Result of evaluating a settle event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Settle {
    /// The guard was already idle.
    NotLocked,
    /// The fly duration has not elapsed yet.
    StillLocked {
        /// Time left before the lock may be released.
        remaining: Duration,
    },
    /// The guard returned to idle; `replay` holds a parked search, if any.
    Released {
        /// Newest search parked while locked.
        replay: Option<Coordinate>,
    },
}

/// Input lock held for the duration of a camera fly-to.
#[derive(Debug, Clone)]
pub struct CameraTransitionGuard {
    state: TransitionState,
    fly_duration: Duration,
    policy: ReentryPolicy,
    parked: Option<Coordinate>,
}

impl CameraTransitionGuard {
    /// Idle guard whose lock window lasts `fly_duration`.
    #[must_use]
    pub const fn new(fly_duration: Duration, policy: ReentryPolicy) -> Self {
        Self {
            state: TransitionState::Idle,
            fly_duration,
            policy,
            parked: None,
        }
    }

    #[cfg(test)]
    pub(crate) const fn state(&self) -> TransitionState {
        self.state
    }

    /// Whether a fly-to currently holds the lock.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        matches!(self.state, TransitionState::Locked { .. })
    }

    /// Try to start a transition towards `target` at `now`.
    pub fn try_lock(&mut self, now: DateTime<Utc>, target: Coordinate) -> Admission {
        if self.is_locked() {
            return match self.policy {
                ReentryPolicy::Drop => Admission::Rejected,
                ReentryPolicy::ReplayLatest => {
                    self.parked = Some(target);
                    Admission::Deferred
                }
            };
        }
        self.state = TransitionState::Locked { started_at: now };
        Admission::Accepted
    }

    /// Evaluate a camera settle event observed at `now`.
    pub fn settle(&mut self, now: DateTime<Utc>) -> Settle {
        let TransitionState::Locked { started_at } = self.state else {
            return Settle::NotLocked;
        };

        // A clock that moved backwards counts as no time elapsed.
        let elapsed = (now - started_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        if elapsed < self.fly_duration {
            return Settle::StillLocked {
                remaining: self.fly_duration.saturating_sub(elapsed),
            };
        }

        self.state = TransitionState::Idle;
        Settle::Released {
            replay: self.parked.take(),
        }
    }

    /// Drop the lock without waiting for the camera, discarding any parked
    /// search.
    ///
    /// Used when the fly-to could not be started, so no settle event will
    /// ever arrive.
    pub const fn abort(&mut self) {
        self.state = TransitionState::Idle;
        self.parked = None;
    }
}

#[cfg(test)]
mod tests {
    //! Lock-window coverage for the camera transition guard.

    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use rstest::{fixture, rstest};

    const FLY: Duration = Duration::from_millis(3_000);

    #[fixture]
    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0)
            .single()
            .expect("valid time")
    }

    fn target(longitude: f64) -> Coordinate {
        Coordinate::new(longitude, 37.75).expect("valid coordinate")
    }

    fn at(t0: DateTime<Utc>, millis: i64) -> DateTime<Utc> {
        t0 + TimeDelta::milliseconds(millis)
    }

    #[rstest]
    fn rejects_reentry_inside_lock_window(t0: DateTime<Utc>) {
        let mut guard = CameraTransitionGuard::new(FLY, ReentryPolicy::Drop);

        assert_eq!(guard.try_lock(t0, target(-122.4)), Admission::Accepted);
        assert_eq!(
            guard.try_lock(at(t0, 1_500), target(-122.5)),
            Admission::Rejected
        );
        assert_eq!(
            guard.settle(at(t0, 2_999)),
            Settle::StillLocked {
                remaining: Duration::from_millis(1),
            }
        );
        assert!(guard.is_locked());

        assert_eq!(
            guard.settle(at(t0, 3_001)),
            Settle::Released { replay: None }
        );
        assert_eq!(guard.state(), TransitionState::Idle);
        assert_eq!(
            guard.try_lock(at(t0, 3_002), target(-122.5)),
            Admission::Accepted
        );
    }

    #[rstest]
    fn replay_policy_keeps_latest_parked_search(t0: DateTime<Utc>) {
        let mut guard = CameraTransitionGuard::new(FLY, ReentryPolicy::ReplayLatest);
        guard.try_lock(t0, target(-122.4));

        assert_eq!(guard.try_lock(at(t0, 100), target(-122.5)), Admission::Deferred);
        assert_eq!(guard.try_lock(at(t0, 200), target(-122.6)), Admission::Deferred);

        assert_eq!(
            guard.settle(at(t0, 3_000)),
            Settle::Released {
                replay: Some(target(-122.6)),
            }
        );
        assert_eq!(guard.settle(at(t0, 3_100)), Settle::NotLocked);
    }

    #[rstest]
    fn backwards_clock_keeps_lock(t0: DateTime<Utc>) {
        let mut guard = CameraTransitionGuard::new(FLY, ReentryPolicy::Drop);
        guard.try_lock(t0, target(-122.4));

        assert!(matches!(
            guard.settle(at(t0, -500)),
            Settle::StillLocked { remaining } if remaining == FLY
        ));
    }

    #[rstest]
    fn abort_unlocks_and_forgets_parked_search(t0: DateTime<Utc>) {
        let mut guard = CameraTransitionGuard::new(FLY, ReentryPolicy::ReplayLatest);
        guard.try_lock(t0, target(-122.4));
        guard.try_lock(at(t0, 100), target(-122.5));

        guard.abort();

        assert_eq!(guard.state(), TransitionState::Idle);
        assert_eq!(guard.settle(at(t0, 3_000)), Settle::NotLocked);
        assert_eq!(guard.try_lock(at(t0, 200), target(-122.6)), Admission::Accepted);
        assert_eq!(
            guard.settle(at(t0, 3_200)),
            Settle::Released { replay: None }
        );
    }

    #[rstest]
    #[case("drop", ReentryPolicy::Drop)]
    #[case(" Replay-Latest ", ReentryPolicy::ReplayLatest)]
    #[case("replay_latest", ReentryPolicy::ReplayLatest)]
    fn parses_policy_names(#[case] raw: &str, #[case] expected: ReentryPolicy) {
        assert_eq!(raw.parse::<ReentryPolicy>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_policy_name() {
        assert!("queue".parse::<ReentryPolicy>().is_err());
    }
}
