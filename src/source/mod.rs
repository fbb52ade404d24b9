//! Source registry and per-source adapters
//!
//! A source is an external data provider with its own rate limit and
//! response shape. Every adapter implements the uniform [`FeatureSource`]
//! contract and owns its client, rate limiter, and retry wrapping; the
//! orchestrator only sees registered source ids and normalized payloads.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;

use crate::catalog::FeatureMetadata;
use crate::pipeline::config::{HTTP_CONNECT_TIMEOUT, HTTP_REQUEST_TIMEOUT, MAX_ATTEMPTS};

pub mod atcc;
pub mod exa_answer;
pub mod extract;
pub mod ncbi;
pub mod nih_reporter;
pub mod protocols_io;

pub use atcc::AtccSource;
pub use exa_answer::ExaAnswerSource;
pub use extract::ExtractClient;
pub use ncbi::NcbiSource;
pub use nih_reporter::NihReporterSource;
pub use protocols_io::ProtocolsIoSource;

/// Default registration order. Mirrors the declarative registry: iteration
/// order over sources is registration order, which fixes output row order.
pub const DEFAULT_SOURCE_IDS: [&str; 5] =
    ["protocols_io", "ncbi", "nih_reporter", "atcc", "exa_answer"];

/// Source adapter errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Non-success HTTP status (other than 429)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Transport-level failure (timeout, connection refused, DNS)
    #[error("network error: {0}")]
    Network(String),

    /// Rate limit exceeded (429 response)
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    /// Response did not match the expected schema
    #[error("parse error: {0}")]
    Parse(String),

    /// Response was structurally unusable
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Web-extraction service returned no usable data
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Missing or invalid configuration (credentials, limiter settings)
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SourceError {
    /// Whether this failure is worth another attempt for the JSON APIs:
    /// transport errors and any HTTP status failure, mirroring the upstream
    /// services' guidance to simply retry. Schema mismatches and
    /// configuration problems propagate immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::Http(_) | SourceError::Network(_) | SourceError::RateLimited(_)
        )
    }
}

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Uniform adapter contract implemented by every source.
///
/// "No results found" is a valid zero-count payload, never an error;
/// transport and schema failures are errors and propagate to the
/// orchestrator after the adapter's own retries are exhausted.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Fetch one feature for one organism.
    ///
    /// Returns the source's typed result converted to a JSON value, or
    /// `None` when the source has nothing to report for this feature.
    async fn fetch(
        &self,
        organism_id: i64,
        organism_scientific_name: &str,
        feature: &FeatureMetadata,
    ) -> SourceResult<Option<Value>>;
}

/// Registry of source adapters, iterated in registration order.
///
/// Static, process-wide, read-only after construction.
#[derive(Default)]
pub struct SourceRegistry {
    entries: Vec<(String, Arc<dyn FeatureSource>)>,
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build the registry with every production source, constructing one
    /// shared HTTP client and reading credentials from the environment.
    ///
    /// # Errors
    /// Fails before any network traffic if a source's credentials are
    /// missing, so configuration problems surface immediately rather than
    /// mid-batch.
    pub fn with_default_sources() -> SourceResult<Self> {
        Self::with_max_attempts(MAX_ATTEMPTS)
    }

    /// Like [`with_default_sources`](Self::with_default_sources) but with an
    /// overridden per-call attempt ceiling for the HTTP API sources.
    pub fn with_max_attempts(max_attempts: u32) -> SourceResult<Self> {
        let client = build_http_client()?;

        let mut registry = Self::new();
        registry.register(
            "protocols_io",
            Arc::new(ProtocolsIoSource::from_env(&client, max_attempts)?),
        );
        registry.register("ncbi", Arc::new(NcbiSource::from_env(&client, max_attempts)?));
        registry.register(
            "nih_reporter",
            Arc::new(NihReporterSource::new(&client, max_attempts)?),
        );
        registry.register("atcc", Arc::new(AtccSource::from_env(&client)?));
        registry.register(
            "exa_answer",
            Arc::new(ExaAnswerSource::from_env(&client, max_attempts)?),
        );
        Ok(registry)
    }

    /// Register a source. Later registrations of the same id are rejected
    /// silently in favor of the first.
    pub fn register(&mut self, source_id: impl Into<String>, source: Arc<dyn FeatureSource>) {
        let source_id = source_id.into();
        if !self.contains(&source_id) {
            self.entries.push((source_id, source));
        }
    }

    /// Whether `source_id` is registered.
    pub fn contains(&self, source_id: &str) -> bool {
        self.entries.iter().any(|(id, _)| id == source_id)
    }

    /// Look up a source by id.
    pub fn get(&self, source_id: &str) -> Option<&Arc<dyn FeatureSource>> {
        self.entries
            .iter()
            .find(|(id, _)| id == source_id)
            .map(|(_, source)| source)
    }

    /// Registered source ids, in registration order.
    pub fn source_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the HTTP client shared by all source adapters.
///
/// One explicitly constructed client, passed by reference into each source,
/// keeps connection pooling effective without ambient global state.
pub fn build_http_client() -> SourceResult<Client> {
    Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .timeout(HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| SourceError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Map a reqwest transport error to a [`SourceError`].
pub(crate) fn transport_error(e: reqwest::Error) -> SourceError {
    SourceError::Network(e.to_string())
}

/// Convert a non-success response into the matching [`SourceError`],
/// passing successful responses through.
pub(crate) async fn error_for_status(response: reqwest::Response) -> SourceResult<reqwest::Response> {
    let status = response.status();
    if status.as_u16() == 429 {
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::RateLimited(format!("{status}: {body}")));
    }
    if status.is_client_error() || status.is_server_error() {
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Http(format!("{status}: {body}")));
    }
    Ok(response)
}

/// Characters kept verbatim when percent-encoding display URLs.
const URL_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a query term for inclusion in a human-facing search URL.
pub(crate) fn percent_encode(term: &str) -> String {
    utf8_percent_encode(term, URL_SAFE).to_string()
}
