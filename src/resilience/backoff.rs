//! Exponential backoff and the per-request retry schedule.

use std::time::{Duration, Instant};

/// Base delay multiplied by `2^attempt`.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(1000);

/// Longest per-attempt timeout; larger values (e.g. `Duration::MAX`) are clamped to it.
pub const MAX_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(86_400 * 365);

/// Delay that follows failed attempt number `attempt` (1-based).
///
/// `2^attempt * base`, saturating instead of overflowing.
pub fn calculate_backoff(attempt: u32, base: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    base.saturating_mul(factor)
}

/// Retry bookkeeping for one logical request.
///
/// The connector drives this value through its attempt loop: call
/// [`RetrySchedule::start_attempt`] before each network call and
/// [`RetrySchedule::next_delay`] after a failure. Nothing here sleeps,
/// so the schedule is testable without timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySchedule {
    attempt: u32,
    max_attempts: u32,
    base: Duration,
    attempt_timeout: Duration,
    deadline: Option<Instant>,
}

impl RetrySchedule {
    /// A schedule allowing `retries + 1` attempts, each bounded by `attempt_timeout`.
    pub fn new(retries: u32, attempt_timeout: Duration, base: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts: retries.saturating_add(1),
            base,
            attempt_timeout: attempt_timeout.min(MAX_ATTEMPT_TIMEOUT),
            deadline: None,
        }
    }

    /// Begin the next attempt and return its deadline.
    pub fn start_attempt(&mut self, now: Instant) -> Instant {
        self.attempt += 1;
        let deadline = now
            .checked_add(self.attempt_timeout)
            .or_else(|| now.checked_add(Duration::from_secs(86_400)))
            .unwrap_or(now);
        self.deadline = Some(deadline);
        deadline
    }

    /// Delay before the next attempt, or `None` when the budget is spent.
    pub fn next_delay(&self) -> Option<Duration> {
        if self.attempt == 0 || self.attempt >= self.max_attempts {
            return None;
        }
        Some(calculate_backoff(self.attempt, self.base))
    }

    /// Number of attempts started so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Deadline of the attempt in flight.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }
}
