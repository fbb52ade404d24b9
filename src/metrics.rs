//! Fetch observability metrics
//!
//! Uses the `metrics` crate for low-overhead collection with an optional
//! Prometheus scrape endpoint. Recording degrades to a no-op when no
//! exporter is installed, so library users pay nothing unless they opt in.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Install the Prometheus exporter and register metric descriptions.
///
/// Call once at startup; typically gated behind a CLI flag.
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "feature_fetches_completed_total",
        Unit::Count,
        "Total number of (organism, feature) fetches that succeeded"
    );

    describe_counter!(
        "feature_fetches_failed_total",
        Unit::Count,
        "Total number of (organism, feature) fetches that failed after retries"
    );

    describe_histogram!(
        "feature_fetch_duration_seconds",
        Unit::Seconds,
        "Duration of one (organism, feature) fetch including retries"
    );

    describe_counter!(
        "fetch_retries_total",
        Unit::Count,
        "Total number of retry attempts across all sources"
    );

    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Duration of retry backoff sleeps"
    );

    info!("Metrics system initialized on {}", addr);
    Ok(())
}

/// Record a retry backoff sleep.
pub fn record_retry_backoff(delay: Duration, attempt: u32) {
    counter!(
        "fetch_retries_total",
        "attempt" => attempt.to_string(),
    )
    .increment(1);

    histogram!("retry_backoff_duration_seconds").record(delay.as_secs_f64());
}

/// Tracks one (organism, feature) fetch from dispatch to outcome.
pub struct FetchMetrics {
    source_id: String,
    feature_id: String,
    start_time: Instant,
}

impl FetchMetrics {
    /// Start tracking a fetch.
    pub fn start(source_id: impl Into<String>, feature_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            feature_id: feature_id.into(),
            start_time: Instant::now(),
        }
    }

    /// Record a successful fetch.
    pub fn record_success(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "feature_fetches_completed_total",
            "source_id" => self.source_id.clone(),
            "feature_id" => self.feature_id.clone(),
        )
        .increment(1);

        histogram!(
            "feature_fetch_duration_seconds",
            "source_id" => self.source_id.clone(),
        )
        .record(duration.as_secs_f64());

        debug!(
            source_id = %self.source_id,
            feature_id = %self.feature_id,
            duration_ms = duration.as_millis() as u64,
            "Fetch recorded"
        );
    }

    /// Record a fetch that failed after exhausting retries.
    pub fn record_failure(&self, error: &str) {
        let duration = self.start_time.elapsed();

        counter!(
            "feature_fetches_failed_total",
            "source_id" => self.source_id.clone(),
            "feature_id" => self.feature_id.clone(),
        )
        .increment(1);

        histogram!(
            "feature_fetch_duration_seconds",
            "source_id" => self.source_id.clone(),
        )
        .record(duration.as_secs_f64());

        debug!(
            source_id = %self.source_id,
            feature_id = %self.feature_id,
            error = %error,
            duration_ms = duration.as_millis() as u64,
            "Fetch failure recorded"
        );
    }
}
