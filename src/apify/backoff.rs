//! Poll interval schedule
//!
//! Each polling loop owns its own [`Backoff`]; nothing is shared between runs.

use std::time::Duration;

/// Interval before the first re-poll
pub const INITIAL_INTERVAL: Duration = Duration::from_secs(1);

/// Ceiling for the doubled interval
pub const MAX_INTERVAL: Duration = Duration::from_secs(60);

/// Capped exponential poll interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    current: Duration,
    max: Duration,
    enabled: bool,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_INTERVAL, true)
    }
}

impl Backoff {
    /// Create a schedule starting at `initial`
    ///
    /// With `enabled` false the interval never grows.
    pub fn new(initial: Duration, enabled: bool) -> Self {
        Self {
            current: initial.min(MAX_INTERVAL),
            max: MAX_INTERVAL,
            enabled,
        }
    }

    /// Fixed interval schedule
    pub fn constant(interval: Duration) -> Self {
        Self::new(interval, false)
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return the interval to sleep now and grow the next one
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        if self.enabled {
            self.current = self.current.saturating_mul(2).min(self.max);
        }
        delay
    }
}
