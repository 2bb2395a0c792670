//! Session time.
//!
//! Timestamps are the wall-clock instant the session started plus tokio's
//! monotonic elapsed time. Pausing or advancing tokio's clock therefore
//! ages events and closes bets exactly as it drives the task timers.

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

/// Wall-clock time that advances with tokio's clock.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    base: DateTime<Utc>,
    origin: Instant,
}

impl SessionClock {
    /// A clock reading the current wall-clock time.
    pub fn start() -> Self {
        Self::starting_at(Utc::now())
    }

    /// A clock reading `base` now.
    pub fn starting_at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            origin: Instant::now(),
        }
    }

    /// Current session time.
    pub fn now(&self) -> DateTime<Utc> {
        TimeDelta::from_std(self.origin.elapsed())
            .ok()
            .and_then(|elapsed| self.base.checked_add_signed(elapsed))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
