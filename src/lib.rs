//! # Organism Tractability Library
//!
//! A batch fetcher for per-organism "tractability features" from external
//! scientific data sources. Designed for building long-format feature tables
//! used in organism tractability assessments.
//!
//! ## Features
//!
//! - **Multi-Source Support**: NCBI E-utilities, NIH RePORTER, protocols.io,
//!   ATCC (via a web-extraction service), and the Exa answer API
//! - **Declarative Catalog**: features are declared once in an embedded YAML
//!   catalog and bound to exactly one source
//! - **Rate Limiting**: per-source rate limiters sized to each API's
//!   published limits
//! - **Retry Support**: bounded exponential backoff with jitter around every
//!   outbound network call
//! - **Canonical Output**: one CSV row per (organism, feature) with the
//!   fetched payload serialized as sorted-key JSON
//!
//! ## Quick Start
//!
//! ```no_run
//! use organism_tractability::catalog::FeatureCatalog;
//! use organism_tractability::pipeline::FeaturesPipeline;
//! use organism_tractability::source::SourceRegistry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = FeatureCatalog::load_embedded()?;
//! let registry = SourceRegistry::with_default_sources()?;
//! let pipeline = FeaturesPipeline::new(catalog, registry)?;
//!
//! let rows = pipeline
//!     .fetch_features_for_organism(3077, "Chlorella vulgaris", None)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several core modules:
//!
//! - [`catalog`] - Declarative feature metadata catalog (embedded YAML)
//! - [`source`] - Source registry and per-source adapters
//! - [`pipeline`] - Fetch orchestration, rate limiting, and retry policy
//! - [`input`] - Organism roster parsing and validation
//! - [`output`] - Feature row writers (CSV)
//! - [`cli`] - Command-line entry points
//!
//! ## Output Model
//!
//! Every (organism, feature) pair produces exactly one [`FeatureRow`], even
//! when the source returned no data — absence of data is itself a recorded,
//! queryable fact.

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};

/// Feature metadata catalog
pub mod catalog;

/// CLI command implementations
pub mod cli;

/// Organism roster input parsing
pub mod input;

/// Fetch observability metrics
pub mod metrics;

/// Feature row output writers
pub mod output;

/// Fetch orchestration, rate limiting, and retry
pub mod pipeline;

/// Source registry and adapters
pub mod source;

/// An organism to fetch features for.
///
/// Constructed per input row; carries no identity beyond the input. The
/// `organism_id` is an NCBI taxonomy id (UniProt taxonomy id == NCBI taxid).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organism {
    /// Scientific name, e.g. "Chlorella vulgaris". Never empty.
    pub scientific_name: String,
    /// Integer taxonomy id, e.g. 3077.
    pub organism_id: i64,
}

/// One normalized output row: the payload fetched for a single
/// (organism, feature) pair.
///
/// Created by the orchestrator, never mutated after creation, written once
/// to output and then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Taxonomy id of the organism this row belongs to.
    pub organism_id: i64,
    /// Feature identifier from the catalog.
    pub feature_id: String,
    /// Source identifier from the catalog.
    pub source_id: String,
    /// Normalized payload returned by the source adapter. An empty object
    /// when the source had no data.
    pub fetched_object: serde_json::Value,
}

impl FeatureRow {
    /// Serialize the fetched payload as a canonical JSON string.
    ///
    /// Keys are emitted in sorted order (`serde_json`'s default map is
    /// BTreeMap-backed) and non-ASCII characters are preserved unescaped,
    /// which keeps golden-file comparisons stable.
    pub fn canonical_fetched_object(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.fetched_object)
    }
}
