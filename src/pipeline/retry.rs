//! Retry with bounded exponential backoff and jitter

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::metrics;
use crate::pipeline::config::{MAX_ATTEMPTS, MAX_BACKOFF, MIN_BACKOFF};

/// Retries a fallible async operation with randomized exponential backoff.
///
/// Only failures accepted by the caller-supplied `retryable` predicate
/// trigger another attempt; anything else propagates on first occurrence.
/// After the attempt ceiling is reached the last failure is returned
/// unchanged. Delays are jittered so concurrent callers that fail together
/// do not retry in lockstep.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    min_wait: Duration,
    max_wait: Duration,
}

impl RetryPolicy {
    /// Create a policy with an attempt ceiling and backoff bounds.
    ///
    /// `max_attempts` counts the initial call; it is clamped to at least 1.
    pub fn new(max_attempts: u32, min_wait: Duration, max_wait: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_wait,
            max_wait: max_wait.max(min_wait),
        }
    }

    /// The attempt ceiling.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pick the jittered delay before the attempt after `attempt` failed
    /// (1-indexed): uniform over `[min_wait, min(max_wait, min_wait * 2^(attempt-1))]`.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let min_secs = self.min_wait.as_secs_f64();
        let exp_secs = min_secs * 2f64.powi(attempt.saturating_sub(1).min(32) as i32);
        let upper = exp_secs.min(self.max_wait.as_secs_f64()).max(min_secs);
        let jittered = rand::thread_rng().gen_range(min_secs..=upper);
        Duration::from_secs_f64(jittered)
    }

    /// Run `op` until it succeeds, a non-retryable failure occurs, or the
    /// attempt ceiling is exhausted.
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && retryable(&e) => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying after backoff delay"
                    );
                    metrics::record_retry_backoff(delay, attempt);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_ATTEMPTS, MIN_BACKOFF, MAX_BACKOFF)
    }
}
