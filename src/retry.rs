//! Fixed-depth retry for remote entry operations
//!
//! Every error is treated as retryable. Attempts are counted from
//! `start_attempt` up to and including `max_retries`, so the default policy
//! makes up to 11 calls.

use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{CmsError, Result};

pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// How many times to retry and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Attempt number the first call counts as
    pub start_attempt: u32,
    /// Pause between attempts; `None` retries immediately
    pub delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            start_attempt: 0,
            delay: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn starting_at(mut self, attempt: u32) -> Self {
        self.start_attempt = attempt;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Upper bound on calls this policy will make (always at least one)
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_sub(self.start_attempt) + 1
    }
}

/// Result of a retried operation plus how many calls it took
#[derive(Debug)]
pub struct RetryOutcome<T> {
    attempts: u32,
    result: Result<T>,
}

impl<T> RetryOutcome<T> {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    /// Number of calls made, including the successful one
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    /// Error from the final attempt when every attempt failed
    pub fn last_error(&self) -> Option<&CmsError> {
        self.result.as_ref().err()
    }

    pub fn into_result(self) -> Result<T> {
        self.result
    }
}

/// Run `op` until it succeeds or the policy is exhausted
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = policy.start_attempt;
    let mut attempts = 0;

    loop {
        attempts += 1;

        match op().await {
            Ok(value) => {
                if attempts > 1 {
                    info!(operation, attempts, "Succeeded after retrying");
                }
                return RetryOutcome {
                    attempts,
                    result: Ok(value),
                };
            }
            Err(error) if attempt < policy.max_retries => {
                warn!(
                    operation,
                    attempt,
                    max_retries = policy.max_retries,
                    error = %error,
                    "Attempt failed, retrying"
                );
                attempt += 1;

                if let Some(delay) = policy.delay {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(error) => {
                warn!(
                    operation,
                    attempts,
                    error = %error,
                    "Giving up after exhausting retries"
                );
                return RetryOutcome {
                    attempts,
                    result: Err(error),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn flaky(fail_first: u32, calls: &AtomicU32) -> impl Future<Output = Result<u32>> {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        async move {
            if n < fail_first {
                Err(CmsError::Api {
                    status: 503,
                    message: format!("attempt {} unavailable", n),
                })
            } else {
                Ok(n)
            }
        }
    }

    #[test]
    fn test_default_policy_allows_eleven_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 10);
        assert_eq!(policy.max_attempts(), 11);
    }

    #[test]
    fn test_start_attempt_past_limit_still_tries_once() {
        assert_eq!(RetryPolicy::new(2).starting_at(5).max_attempts(), 1);
        assert_eq!(RetryPolicy::new(4).starting_at(1).max_attempts(), 4);
    }

    #[tokio::test]
    async fn test_succeeds_on_final_attempt() {
        let calls = AtomicU32::new(0);
        let outcome = retry(&RetryPolicy::new(2), "test", || flaky(2, &calls)).await;

        assert!(outcome.succeeded());
        assert_eq!(outcome.attempts(), 3);
        assert_eq!(outcome.value(), Some(&2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_and_keeps_last_error() {
        let calls = AtomicU32::new(0);
        let outcome = retry(&RetryPolicy::new(3), "test", || flaky(u32::MAX, &calls)).await;

        assert!(!outcome.succeeded());
        assert_eq!(outcome.attempts(), 4);
        let err = outcome.last_error().unwrap();
        assert!(err.to_string().contains("attempt 3"));
    }

    #[tokio::test]
    async fn test_zero_retries_makes_single_attempt() {
        let calls = AtomicU32::new(0);
        let outcome = retry(&RetryPolicy::new(0), "test", || flaky(u32::MAX, &calls)).await;

        assert!(!outcome.succeeded());
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_start_attempt_shortens_budget() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(10).starting_at(8);
        let outcome = retry(&policy, "test", || flaky(u32::MAX, &calls)).await;

        assert_eq!(outcome.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2).with_delay(Duration::from_secs(5));
        let started = tokio::time::Instant::now();

        let outcome = retry(&policy, "test", || flaky(2, &calls)).await;

        assert!(outcome.succeeded());
        assert!(started.elapsed() >= Duration::from_secs(10));
    }
}
