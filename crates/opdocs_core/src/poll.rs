//! Bounded polling with an injectable clock.
//!
//! # Responsibility
//! - Retry a side-effect-free check at a fixed interval, up to a fixed attempt budget.
//! - Keep time behind `Clock` so callers can run without real sleeping.
//!
//! # Invariants
//! - `check` runs at most `max_attempts` times.
//! - The clock sleeps only between attempts, never after the last one.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Interval used while waiting for creation confirmation.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Attempts made before giving up on a confirmation.
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 10;

/// Time source used by polling loops.
pub trait Clock {
    fn sleep(&self, duration: Duration);
}

/// Clock backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<K: Clock + ?Sized> Clock for &K {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Interval and attempt budget of one polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_POLL_MAX_ATTEMPTS)
    }
}

/// Attempt budget exhausted without a positive check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimeout {
    pub attempts: u32,
    pub waited: Duration,
}

impl Display for PollTimeout {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "condition not met after {} attempts ({} ms)",
            self.attempts,
            self.waited.as_millis()
        )
    }
}

impl Error for PollTimeout {}

/// Runs `check` until it yields a value or the attempt budget is spent.
pub fn poll_until<T, K, F>(clock: &K, policy: PollPolicy, mut check: F) -> Result<T, PollTimeout>
where
    K: Clock + ?Sized,
    F: FnMut() -> Option<T>,
{
    let mut waited = Duration::ZERO;
    for attempt in 1..=policy.max_attempts {
        if let Some(value) = check() {
            return Ok(value);
        }
        if attempt < policy.max_attempts {
            clock.sleep(policy.interval);
            waited += policy.interval;
        }
    }

    Err(PollTimeout {
        attempts: policy.max_attempts,
        waited,
    })
}
