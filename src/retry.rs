//! Per-request retry policy for transport timeouts.
//!
//! Only [`Error::Timeout`] is ever retried. Every other failure, and every
//! response the server actually answered, ends the request immediately.

use crate::Error;
use std::time::Duration;

/// Delay used between attempts when the policy does not set one.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1);

/// How the delay grows between consecutive re-issues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backoff {
    /// Wait `retry_delay` before every re-issue.
    #[default]
    Fixed,

    /// Wait `retry_delay * 2^(n - 1)` before the n-th re-issue, capped at `max_delay`.
    Exponential {
        /// Upper bound for a single delay.
        max_delay: Duration,
    },
}

/// Retry policy attached to a [`crate::RequestDescriptor`].
///
/// `max_attempts` counts every dispatch of the logical request, the first one
/// included. A value of `0` or `1` disables retrying.
///
/// # Examples
///
/// ```
/// use restwell::{RetryPolicy, retry::Backoff};
/// use std::time::Duration;
///
/// // Up to 3 dispatches, 10ms apart.
/// let fixed = RetryPolicy::new(3).with_delay(Duration::from_millis(10));
/// assert_eq!(fixed.delay_for_attempt(1), Some(Duration::from_millis(10)));
/// assert_eq!(fixed.delay_for_attempt(3), None);
///
/// // 100ms, 200ms, 400ms...
/// let exponential = RetryPolicy::new(5)
///     .with_delay(Duration::from_millis(100))
///     .with_backoff(Backoff::Exponential { max_delay: Duration::from_secs(2) });
/// assert_eq!(exponential.delay_for_attempt(3), Some(Duration::from_millis(400)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of dispatches allowed, the initial one included.
    pub max_attempts: usize,
    /// Base delay before a re-issue.
    pub retry_delay: Duration,
    /// Growth of the delay across re-issues.
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Creates a fixed-delay policy allowing `max_attempts` dispatches.
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            retry_delay: DEFAULT_RETRY_DELAY,
            backoff: Backoff::Fixed,
        }
    }

    /// Sets the base delay between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the backoff growth.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns the delay before re-issuing after `attempt` dispatches have
    /// failed, or `None` if the budget is spent.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The number of dispatches made so far (1-indexed)
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }

        match self.backoff {
            Backoff::Fixed => Some(self.retry_delay),
            Backoff::Exponential { max_delay } => {
                let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1) as u32);
                Some(self.retry_delay.saturating_mul(multiplier).min(max_delay))
            }
        }
    }
}

/// What to do with a failed dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then re-issue the same descriptor.
    Retry(Duration),
    /// Propagate the failure to the caller.
    GiveUp,
}

impl RetryDecision {
    /// Classifies a failed dispatch.
    ///
    /// Retries only when `error` is a timeout, a policy is present, and
    /// `attempt` dispatches have not yet used up the policy. The delay is the
    /// minimum gap between the failed dispatch timing out and the next one.
    pub fn decide(policy: Option<&RetryPolicy>, error: &Error, attempt: usize) -> Self {
        if !error.is_timeout() {
            return RetryDecision::GiveUp;
        }

        match policy.and_then(|p| p.delay_for_attempt(attempt)) {
            Some(delay) => RetryDecision::Retry(delay),
            None => RetryDecision::GiveUp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delays() {
        let policy = RetryPolicy::new(3).with_delay(Duration::from_millis(10));

        assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(10)));
        assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(10)));
        assert_eq!(policy.delay_for_attempt(3), None);
        assert_eq!(policy.delay_for_attempt(4), None);
    }

    #[test]
    fn test_default_delay_is_one_millisecond() {
        let policy = RetryPolicy::new(2);
        assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(1)));
    }

    #[test]
    fn test_exponential_delays() {
        let policy = RetryPolicy::new(6)
            .with_delay(Duration::from_millis(100))
            .with_backoff(Backoff::Exponential {
                max_delay: Duration::from_millis(500),
            });

        assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_for_attempt(3), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay_for_attempt(4), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_for_attempt(5), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_for_attempt(6), None);
    }

    #[test]
    fn test_zero_and_one_disable_retry() {
        assert_eq!(RetryPolicy::new(0).delay_for_attempt(1), None);
        assert_eq!(RetryPolicy::new(1).delay_for_attempt(1), None);
    }

    #[test]
    fn test_non_timeout_is_never_retried() {
        let policy = RetryPolicy::new(5);
        let err = Error::ConfigurationError("bad".to_string());

        assert_eq!(
            RetryDecision::decide(Some(&policy), &err, 1),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn test_missing_policy_gives_up() {
        let err = Error::ConfigurationError("bad".to_string());
        assert_eq!(RetryDecision::decide(None, &err, 1), RetryDecision::GiveUp);
    }
}
