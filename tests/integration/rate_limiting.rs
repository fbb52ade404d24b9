//! Integration tests for rate limiting and concurrency capping

use organism_tractability::pipeline::{ConcurrencyLimiter, RateLimiter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[test]
fn test_rate_limiter_rejects_non_positive_rates() {
    assert!(RateLimiter::new(0.0).is_err());
    assert!(RateLimiter::new(-3.5).is_err());
}

#[test]
fn test_concurrency_limiter_rejects_zero_slots() {
    assert!(ConcurrencyLimiter::new(0).is_err());
}

#[tokio::test]
async fn test_sequential_waits_enforce_minimum_interval() {
    // 4 calls at 20/s must take at least 3 * 50ms.
    let limiter = RateLimiter::new(20.0).unwrap();
    let start = Instant::now();
    for _ in 0..4 {
        limiter.wait().await;
    }
    assert!(
        start.elapsed() >= Duration::from_millis(150),
        "4 waits at 20/s finished in {:?}",
        start.elapsed()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rate_bound_holds_across_concurrent_callers() {
    // 6 calls from 3 tasks sharing one limiter at 50/s must span at least
    // 5 * 20ms, no matter how the tasks interleave.
    let limiter = Arc::new(RateLimiter::new(50.0).unwrap());
    let start = Instant::now();

    let mut handles = Vec::new();
    for _ in 0..3 {
        let limiter = limiter.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..2 {
                limiter.wait().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(
        start.elapsed() >= Duration::from_millis(100),
        "6 waits at 50/s finished in {:?}",
        start.elapsed()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrency_cap_never_exceeded() {
    let limiter = Arc::new(ConcurrencyLimiter::new(3).unwrap());
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..12 {
        let limiter = limiter.clone();
        let in_flight = in_flight.clone();
        let peak = peak.clone();
        handles.push(tokio::spawn(async move {
            let _slot = limiter.acquire().await.unwrap();
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    assert_eq!(limiter.available(), 3);
}

#[tokio::test]
async fn test_slot_released_when_task_errors_out() {
    let limiter = Arc::new(ConcurrencyLimiter::new(1).unwrap());

    let held = limiter.clone();
    let handle = tokio::spawn(async move {
        let _slot = held.acquire().await.unwrap();
        panic!("simulated task failure");
    });
    assert!(handle.await.is_err());

    // The slot must come back even though the holder panicked.
    let _slot = limiter.acquire().await.unwrap();
    assert_eq!(limiter.available(), 0);
}
