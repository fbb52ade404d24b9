//! Fetch orchestration, rate limiting, and retry
//!
//! This module is the core of the crate: a registry-driven dispatcher that
//! iterates organisms × sources × features, applies per-source throttling,
//! and flattens heterogeneous source responses into uniform output rows.
//!
//! # Components
//!
//! - [`orchestrator`] - The [`FeaturesPipeline`] fetch orchestrator and
//!   batch driver
//! - [`rate_limit`] - [`RateLimiter`] (minimum inter-call interval) and
//!   [`ConcurrencyLimiter`] (bounded in-flight calls)
//! - [`retry`] - [`RetryPolicy`], bounded exponential backoff with jitter
//! - [`config`] - Tunable constants (attempt ceilings, backoff bounds,
//!   HTTP timeouts)
//!
//! # Failure semantics
//!
//! Retries happen strictly around individual outbound network calls inside
//! the source adapters. The orchestrator itself does not catch adapter
//! failures: a source/feature fetch that exhausts its retries aborts the
//! whole per-organism fetch, so callers get either the complete row set for
//! an organism or none of it. Whether the batch then continues or aborts is
//! the caller's decision; the batch driver in this crate aborts.

pub mod config;
pub mod orchestrator;
pub mod rate_limit;
pub mod retry;

pub use orchestrator::FeaturesPipeline;
pub use rate_limit::{ConcurrencyLimiter, RateLimitError, RateLimiter};
pub use retry::RetryPolicy;

use crate::catalog::CatalogError;
use crate::input::InputError;
use crate::output::OutputError;
use crate::source::SourceError;

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Requested source ids that are not in the registry
    #[error(
        "invalid source ids: {}. Available sources: {}",
        invalid.join(", "),
        available.join(", ")
    )]
    InvalidSourceIds {
        /// The requested ids that are not registered.
        invalid: Vec<String>,
        /// Every registered source id, in registration order.
        available: Vec<String>,
    },

    /// The catalog references a source id with no registered adapter
    #[error("catalog references unregistered source: {0}")]
    UnregisteredCatalogSource(String),

    /// Source adapter error
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Catalog error
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Input roster error
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// Output writer error
    #[error("output error: {0}")]
    Output(#[from] OutputError),
}
