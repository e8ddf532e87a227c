//! Bounded exponential backoff policy for transient fetch failures.

use std::time::Duration;

/// Retry schedule for a single page request.
///
/// Delays double from `base_delay` per attempt and are capped at
/// `max_delay`. The policy only describes the schedule; the retry loop in
/// [`crate::source::HttpPageSource`] decides *whether* an error is worth
/// retrying via [`crate::Error::is_retryable`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the given failed attempt (1-based).
    ///
    /// Attempt 1 waits `base_delay`, attempt 2 waits twice that, and so
    /// on, capped at `max_delay`. The shift is saturating so pathological
    /// `max_attempts` values cannot overflow.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        std::cmp::min(self.base_delay.saturating_mul(factor), self.max_delay)
    }
}
