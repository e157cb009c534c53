//! Exponential backoff shared by the queue and the notification dispatcher.

use std::time::Duration;

/// Exponential backoff with a ceiling.
///
/// The delay after attempt `n` (1-based) is `base * 2^(n - 1)`, capped at
/// `cap`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tasklink::queue::domain::BackoffPolicy;
///
/// let policy = BackoffPolicy::new(Duration::from_secs(2), Duration::from_secs(10));
/// assert_eq!(policy.delay_for(1), Duration::from_secs(2));
/// assert_eq!(policy.delay_for(3), Duration::from_secs(8));
/// assert_eq!(policy.delay_for(4), Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
}

impl BackoffPolicy {
    /// Creates a policy with the given first delay and ceiling.
    #[must_use]
    pub const fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// A policy that never waits.
    #[must_use]
    pub const fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Returns the delay to wait after the given failed attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 2_u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }

    /// Same as [`Self::delay_for`], as a `chrono` duration for timestamps.
    #[must_use]
    pub fn chrono_delay_for(&self, attempt: u32) -> chrono::Duration {
        chrono::Duration::from_std(self.delay_for(attempt)).unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(300))
    }
}
