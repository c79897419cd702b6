//! Randomized pre-request pacing.
//!
//! Every descriptor request is preceded by a sleep drawn uniformly from a
//! fixed range. With many workers running at once this spreads requests out
//! instead of firing them in lockstep bursts at the archive.

use std::time::Duration;

use rand::Rng;
use tracing::trace;

use super::constants::{DEFAULT_MAX_DELAY, DEFAULT_MIN_DELAY};

/// Bounded random delay applied before each network attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    min: Duration,
    max: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_DELAY,
            max: DEFAULT_MAX_DELAY,
        }
    }
}

impl Pacing {
    /// Creates a pacing range. Bounds are swapped if given in reverse.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Pacing that never sleeps.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Returns true if no delay is ever applied.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.max.is_zero()
    }

    /// Lower bound of the delay.
    #[must_use]
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound of the delay.
    #[must_use]
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draws one delay from the range.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min_ms = u64::try_from(self.min.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
    }

    /// Sleeps for one drawn delay.
    pub async fn pause(&self) {
        if self.is_disabled() {
            return;
        }
        let delay = self.next_delay();
        trace!(delay_ms = delay.as_millis(), "pacing before request");
        tokio::time::sleep(delay).await;
    }
}
