//! Bounded retry with a randomized pause between attempts.
//!
//! Transport failures and unexpected statuses are retried. A 404 is a
//! definitive answer about the page, and a bad proxy or client setup fails
//! the same way on every attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    /// Total attempts, including the first.
    pub(crate) max_attempts: u32,
    pub(crate) min_delay: Duration,
    pub(crate) max_delay: Duration,
}

impl RetryPolicy {
    fn jitter(&self) -> Duration {
        let min = u64::try_from(self.min_delay.as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::random_range(min..=max))
    }
}

fn is_retriable(err: &FetchError) -> bool {
    matches!(
        err,
        FetchError::Transport { .. } | FetchError::UnexpectedStatus { .. }
    )
}

/// Runs `operation` until it succeeds, fails with a non-retriable error, or
/// `policy.max_attempts` attempts have been made. The attempt number
/// (starting at 1) is passed to `operation`.
///
/// The last error is returned once attempts are exhausted.
pub(crate) async fn retry_with_jitter<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        let err = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_attempts {
            return Err(err);
        }

        let delay = policy.jitter();
        tracing::warn!(
            attempt,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "fetch failed; retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
