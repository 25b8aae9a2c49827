//! Retry policy for failed units of work
//!
//! A pure decision function: given the failure and how many times the unit
//! has already been retried, return the delay before the next attempt or
//! `None` to surface the failure.

use crate::error::Error;
use std::time::Duration;

/// Fixed-delay, bounded retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of re-attempts after the first failure
    pub max_retries: u32,
    /// Delay before each re-attempt
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            delay: Duration::from_millis(25),
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }

    /// Decide whether a failed unit gets another attempt.
    ///
    /// `retry_count` is the number of retries already granted to the unit.
    pub fn decide(&self, error: &Error, retry_count: u32) -> Option<Duration> {
        if !error.is_transport() || retry_count >= self.max_retries {
            return None;
        }
        Some(self.delay)
    }
}

#[cfg(test)]
mod retry_tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 1);
        assert_eq!(policy.delay, Duration::from_millis(25));
    }

    #[test_case(0, Some(Duration::from_millis(25)) ; "first failure is retried")]
    #[test_case(1, None ; "second failure is final")]
    #[test_case(7, None ; "never retries past the budget")]
    fn test_single_retry_on_transport_error(retry_count: u32, expected: Option<Duration>) {
        let policy = RetryPolicy::default();
        let err = Error::connection("connection reset");
        assert_eq!(policy.decide(&err, retry_count), expected);
    }

    #[test_case(Error::http_status(500, "boom") ; "server error status")]
    #[test_case(Error::http_status(404, "missing") ; "client error status")]
    #[test_case(Error::decode("not json") ; "decode error")]
    #[test_case(Error::DeadlineExceeded { deadline_ms: 5 } ; "deadline")]
    fn test_non_transport_errors_are_not_retried(err: Error) {
        assert_eq!(RetryPolicy::default().decide(&err, 0), None);
    }

    #[test]
    fn test_retry_policy_none() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.decide(&Error::Timeout { timeout_ms: 10 }, 0), None);
    }

    #[test]
    fn test_retry_policy_custom_budget() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let err = Error::Timeout { timeout_ms: 10 };
        assert_eq!(policy.decide(&err, 2), Some(Duration::from_millis(100)));
        assert_eq!(policy.decide(&err, 3), None);
    }
}
