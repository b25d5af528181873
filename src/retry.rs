//! The two retry layers composed by [`InferenceClient`](crate::InferenceClient).
//!
//! - [`TransportRetryPolicy`] sits beneath a single attempt and reacts only to
//!   server-reported overload statuses.
//! - [`AttemptRetryPolicy`] drives the attempt loop of a chat call and reacts
//!   to the class of error an attempt ended with.

use std::time::Duration;

use reqwest::StatusCode;

use crate::InferenceError;

/// Status-code driven retry applied to every request a session sends.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransportRetryPolicy {
    /// Maximum number of resends after the first request.
    pub total: u32,
    /// Linear backoff factor in milliseconds.
    pub backoff_factor_ms: u64,
    /// Statuses that trigger a resend.
    pub status_forcelist: Vec<u16>,
}

impl Default for TransportRetryPolicy {
    fn default() -> Self {
        Self {
            total: 3,
            backoff_factor_ms: 1_000,
            status_forcelist: vec![429, 500, 502, 503, 504],
        }
    }
}

impl TransportRetryPolicy {
    /// A policy that never resends.
    pub fn none() -> Self {
        Self {
            total: 0,
            ..Self::default()
        }
    }

    pub fn should_retry(&self, status: StatusCode) -> bool {
        self.status_forcelist.contains(&status.as_u16())
    }

    /// Wait before resend number `retry_index` (zero-based): 0, 1x, 2x, ...
    pub fn delay(&self, retry_index: u32) -> Duration {
        Duration::from_millis(
            self.backoff_factor_ms
                .saturating_mul(u64::from(retry_index)),
        )
    }
}

/// Error-class driven retry for the attempt loop of a chat call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttemptRetryPolicy {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Base of the exponential wait after a timed-out attempt.
    pub backoff_base: u32,
    /// Unit the exponential wait is expressed in, in milliseconds.
    pub backoff_unit_ms: u64,
    /// Added to the per-attempt timeout after each timed-out attempt.
    pub timeout_increment_ms: u64,
    /// Wait after an attempt that failed for any other reason.
    pub flat_delay_ms: u64,
}

impl Default for AttemptRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: 2,
            backoff_unit_ms: 1_000,
            timeout_increment_ms: 30_000,
            flat_delay_ms: 1_000,
        }
    }
}

/// What to do before the next attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryStep {
    pub delay: Duration,
    pub timeout: Duration,
}

impl AttemptRetryPolicy {
    /// Wait after the timed-out attempt `attempt` (zero-based).
    pub fn timeout_delay(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.backoff_base).saturating_pow(attempt.min(31));
        Duration::from_millis(self.backoff_unit_ms.saturating_mul(factor))
    }

    /// Decides whether attempt `attempt` (zero-based), which ran with
    /// `timeout` and failed with `err`, is followed by another one.
    pub fn next_step(
        &self,
        attempt: u32,
        timeout: Duration,
        err: &InferenceError,
    ) -> Option<RetryStep> {
        if attempt.saturating_add(1) >= self.max_attempts {
            return None;
        }

        if err.is_timeout() {
            Some(RetryStep {
                delay: self.timeout_delay(attempt),
                timeout: timeout + Duration::from_millis(self.timeout_increment_ms),
            })
        } else {
            Some(RetryStep {
                delay: Duration::from_millis(self.flat_delay_ms),
                timeout,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::StatusCode;

    use super::{AttemptRetryPolicy, RetryStep, TransportRetryPolicy};
    use crate::InferenceError;

    #[test]
    fn transport_retries_only_listed_statuses() {
        let policy = TransportRetryPolicy::default();
        for status in [429, 500, 502, 503, 504] {
            assert!(policy.should_retry(StatusCode::from_u16(status).unwrap()));
        }
        assert!(!policy.should_retry(StatusCode::NOT_FOUND));
        assert!(!policy.should_retry(StatusCode::BAD_REQUEST));
        assert!(!policy.should_retry(StatusCode::OK));
    }

    #[test]
    fn transport_backoff_is_linear_from_zero() {
        let policy = TransportRetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::ZERO);
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
    }

    #[test]
    fn timeout_delays_grow_exponentially() {
        let policy = AttemptRetryPolicy::default();
        assert_eq!(policy.timeout_delay(0), Duration::from_secs(1));
        assert_eq!(policy.timeout_delay(1), Duration::from_secs(2));
        assert_eq!(policy.timeout_delay(2), Duration::from_secs(4));
    }

    #[test]
    fn cumulative_timeout_sleep_is_sum_of_powers() {
        let policy = AttemptRetryPolicy::default();
        let total: Duration = (0..policy.max_attempts - 1)
            .map(|attempt| policy.timeout_delay(attempt))
            .sum();
        assert_eq!(total, Duration::from_secs(1 + 2));
    }

    #[test]
    fn other_errors_keep_timeout_and_wait_flat() {
        let policy = AttemptRetryPolicy::default();
        let err = InferenceError::Decode("bad json".to_owned());
        let timeout = Duration::from_secs(60);

        for attempt in 0..2 {
            assert_eq!(
                policy.next_step(attempt, timeout, &err),
                Some(RetryStep {
                    delay: Duration::from_secs(1),
                    timeout,
                })
            );
        }
    }

    #[test]
    fn last_attempt_never_retries() {
        let policy = AttemptRetryPolicy::default();
        let err = InferenceError::Http {
            status: 404,
            body: String::new(),
        };
        assert_eq!(policy.next_step(2, Duration::from_secs(60), &err), None);
    }

    #[test]
    fn single_attempt_policy_gives_up_immediately() {
        let policy = AttemptRetryPolicy {
            max_attempts: 1,
            ..AttemptRetryPolicy::default()
        };
        let err = InferenceError::Decode("x".to_owned());
        assert_eq!(policy.next_step(0, Duration::from_secs(1), &err), None);
    }
}
