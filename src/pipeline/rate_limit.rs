//! Rate limiting primitives shared by source adapters
//!
//! Two independent limiters: [`RateLimiter`] enforces a minimum interval
//! between calls to one external API, [`ConcurrencyLimiter`] caps how many
//! calls to one downstream service are in flight at once. Both are safe to
//! share across concurrent callers; they are the only deliberately shared
//! mutable state in the core.

use std::sync::Arc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, Duration, Instant};

/// Proactive rate limiter that enforces a minimum delay between calls.
///
/// Use this to stay under an API's published rate limit by delaying before
/// each request, rather than waiting to hit the limit and then backing off.
/// The wait/record sequence is atomic with respect to other callers: the
/// internal lock is held across the sleep, so two tasks can never both
/// observe a small remaining wait and proceed together.
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a rate limiter allowing `calls_per_second` calls.
    ///
    /// # Errors
    /// Fails if `calls_per_second` is zero, negative, or not finite.
    pub fn new(calls_per_second: f64) -> Result<Self, RateLimitError> {
        if !calls_per_second.is_finite() || calls_per_second <= 0.0 {
            return Err(RateLimitError::InvalidRate(calls_per_second));
        }
        Ok(Self {
            min_interval: Duration::from_secs_f64(1.0 / calls_per_second),
            last_call: Mutex::new(None),
        })
    }

    /// Block until enough time has passed since the last granted call.
    ///
    /// Callers are serialized: each waits out the remaining interval and
    /// records its own grant time before the next caller is admitted.
    pub async fn wait(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());
    }

    /// The enforced minimum interval between calls.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Caps the number of simultaneous in-flight calls to a shared service.
///
/// Acquisition blocks while the pool is exhausted; the returned
/// [`ConcurrencySlot`] releases its slot when dropped, on every exit path.
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

/// An acquired concurrency slot. Dropping it frees the slot.
#[must_use = "the slot is released as soon as it is dropped"]
pub struct ConcurrencySlot {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// Create a limiter with a pool of `max_concurrent` slots.
    ///
    /// # Errors
    /// Fails if `max_concurrent` is zero.
    pub fn new(max_concurrent: usize) -> Result<Self, RateLimitError> {
        if max_concurrent == 0 {
            return Err(RateLimitError::InvalidConcurrency(max_concurrent));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        })
    }

    /// Acquire a slot, blocking until one frees up.
    pub async fn acquire(&self) -> Result<ConcurrencySlot, RateLimitError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| RateLimitError::AcquireError(e.to_string()))?;
        Ok(ConcurrencySlot { _permit: permit })
    }

    /// The configured pool size.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Limiter construction and acquisition errors
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// calls_per_second was not a positive finite number
    #[error("calls_per_second must be positive, got {0}")]
    InvalidRate(f64),

    /// max_concurrent was zero
    #[error("max_concurrent must be positive, got {0}")]
    InvalidConcurrency(usize),

    /// Failed to acquire a concurrency slot
    #[error("failed to acquire concurrency slot: {0}")]
    AcquireError(String),
}
