use std::{ops::Add, time::Duration};

use super::now_since_epoch;

/// A point in time, measured from the UNIX epoch so that native and browser
/// backends agree on the origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant {
    since_epoch: Duration,
}

impl Instant {
    /// Reads the current time from the platform backend
    pub fn now() -> Self {
        Self {
            since_epoch: now_since_epoch(),
        }
    }

    pub fn from_duration_since_epoch(since_epoch: Duration) -> Self {
        Self { since_epoch }
    }

    pub fn duration_since_epoch(&self) -> Duration {
        self.since_epoch
    }

    /// Time elapsed between `earlier` and `self`. Saturates to zero if
    /// `earlier` is actually later.
    pub fn duration_since(&self, earlier: &Instant) -> Duration {
        self.since_epoch.saturating_sub(earlier.since_epoch)
    }

    pub fn elapsed(&self) -> Duration {
        Instant::now().duration_since(self)
    }
}

impl Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Self::Output {
        Instant {
            since_epoch: self.since_epoch.saturating_add(rhs),
        }
    }
}

/// Source of the current time. Injected wherever timing decisions are made so
/// that hosts (and tests) can control the passage of time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Clock backed by the platform's wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
