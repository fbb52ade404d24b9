//! Integration tests for the retry policy

use organism_tractability::pipeline::RetryPolicy;
use organism_tractability::source::SourceError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_millis(1), Duration::from_millis(5))
}

#[tokio::test]
async fn test_retryable_failures_until_success() {
    let policy = fast_policy(5);
    let calls = AtomicU32::new(0);

    let result: Result<&str, SourceError> = policy
        .run(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 5 {
                    Err(SourceError::Http("503 Service Unavailable".to_string()))
                } else {
                    Ok("recovered")
                }
            },
            SourceError::is_transient,
        )
        .await;

    // Fails max_attempts - 1 times, then succeeds on the final attempt.
    assert_eq!(result.unwrap(), "recovered");
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_attempt_ceiling_is_a_hard_bound() {
    let policy = fast_policy(3);
    let calls = AtomicU32::new(0);

    let result: Result<(), SourceError> = policy
        .run(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::Network("timed out".to_string()))
            },
            SourceError::is_transient,
        )
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // The last failure comes back unchanged, not wrapped.
    match result {
        Err(SourceError::Network(msg)) => assert_eq!(msg, "timed out"),
        other => panic!("expected the original network error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_retryable_failure_invoked_exactly_once() {
    let policy = fast_policy(5);
    let calls = AtomicU32::new(0);

    let result: Result<(), SourceError> = policy
        .run(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::Parse("unexpected response shape".to_string()))
            },
            SourceError::is_transient,
        )
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(result, Err(SourceError::Parse(_))));
}

#[tokio::test]
async fn test_rate_limited_responses_are_retried() {
    let policy = fast_policy(2);
    let calls = AtomicU32::new(0);

    let result: Result<&str, SourceError> = policy
        .run(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 1 {
                    Err(SourceError::RateLimited("429 Too Many Requests".to_string()))
                } else {
                    Ok("ok")
                }
            },
            SourceError::is_transient,
        )
        .await;

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
