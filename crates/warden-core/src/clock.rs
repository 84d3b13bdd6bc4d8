//! Time sources.
//!
//! Every time-dependent component takes an `Arc<dyn Clock>` instead of reading
//! the system time directly. Expiry and refill decisions use [`Clock::now`],
//! which is monotonic; [`Clock::wall`] is only used for timestamps shown to
//! humans or serialized.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A source of monotonic and wall-clock time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current monotonic instant.
    fn now(&self) -> Instant;

    /// Current wall-clock time (UTC).
    fn wall(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Monotonic and wall time advance together, so a deadline computed from
/// [`Clock::now`] and a timestamp computed from [`Clock::wall`] stay in step.
pub struct ManualClock {
    state: Mutex<(Instant, DateTime<Utc>)>,
}

impl ManualClock {
    /// Create a clock anchored at the current system time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new((Instant::now(), Utc::now())),
        }
    }

    /// Move the clock forward.
    ///
    /// # Panics
    ///
    /// Panics if the resulting instant is not representable.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|e| {
            tracing::warn!("ManualClock lock poisoned, recovering");
            e.into_inner()
        });
        let Some(instant) = state.0.checked_add(by) else {
            panic!("manual clock advanced past the representable range");
        };
        let wall = TimeDelta::from_std(by)
            .ok()
            .and_then(|delta| state.1.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        *state = (instant, wall);
    }

    fn snapshot(&self) -> (Instant, DateTime<Utc>) {
        *self.state.lock().unwrap_or_else(|e| {
            tracing::warn!("ManualClock lock poisoned, recovering");
            e.into_inner()
        })
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.snapshot().0
    }

    fn wall(&self) -> DateTime<Utc> {
        self.snapshot().1
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("wall", &self.wall())
            .finish_non_exhaustive()
    }
}
