//! Feature metadata catalog
//!
//! The catalog is the immutable, declaratively loaded table of all known
//! features. Each entry binds one feature to exactly one source and carries
//! the source-specific options the adapter needs (query templates, answer
//! enums, product limits). The definition is embedded at compile time and
//! validated as a whole on first load — a single malformed entry fails the
//! entire load rather than producing a partial catalog.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Embedded catalog definition
const CATALOG_YAML: &str = include_str!("features.yaml");

/// Global catalog instance (loaded once)
static CATALOG: Lazy<Result<FeatureCatalog, CatalogError>> =
    Lazy::new(|| FeatureCatalog::from_yaml(CATALOG_YAML));

/// Metadata for one fetchable feature.
///
/// Immutable once loaded. The optional fields are consumed by individual
/// source adapters: `organism_query_type` by NCBI, `query`/`answer_enum` by
/// the answer source, `max_products` by ATCC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMetadata {
    /// Feature identifier, unique within its source (for NCBI this is the
    /// E-utilities database code, e.g. "pubmed").
    pub feature_id: String,
    /// Identifier of the source that serves this feature.
    pub source_id: String,
    /// Human-readable name for presentation.
    pub display_name: String,
    /// Grouping category, e.g. "Literature" or "Availability".
    pub category: String,
    /// Non-empty description of what the feature captures.
    pub description: String,
    /// How the organism is referenced in source queries: "scientific_name"
    /// or "taxonomy_id". Sources default to scientific_name when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organism_query_type: Option<String>,
    /// Closed answer vocabulary for answer-style features.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_enum: Option<Vec<String>>,
    /// Query template with an `{organism}` placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Maximum number of product detail pages to extract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_products: Option<u32>,
    /// Free-form feature type tag, e.g. "text".
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// The validated, declaration-ordered feature table.
#[derive(Debug, Clone)]
pub struct FeatureCatalog {
    features: Vec<FeatureMetadata>,
}

/// Raw catalog structure for deserialization
#[derive(Debug, Deserialize)]
struct RawCatalog {
    features: Vec<FeatureMetadata>,
}

impl FeatureCatalog {
    /// Load the embedded catalog.
    ///
    /// This is a singleton operation - the catalog is parsed and validated
    /// once and cached for the lifetime of the process.
    pub fn load() -> Result<&'static Self, &'static CatalogError> {
        CATALOG.as_ref()
    }

    /// Load the embedded catalog, returning an owned copy.
    pub fn load_embedded() -> Result<Self, CatalogError> {
        Self::from_yaml(CATALOG_YAML)
    }

    /// Parse and validate a catalog from a YAML document.
    ///
    /// Fails the whole load if any entry is malformed — there is no partial
    /// catalog.
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_yaml::from_str(yaml)
            .map_err(|e| CatalogError::ParseError(format!("failed to parse catalog: {e}")))?;

        let mut seen: HashSet<(String, String)> = HashSet::new();
        for (index, feature) in raw.features.iter().enumerate() {
            Self::validate_entry(index, feature)?;
            let key = (feature.source_id.clone(), feature.feature_id.clone());
            if !seen.insert(key) {
                return Err(CatalogError::ValidationError {
                    entry: format!("{}/{}", feature.source_id, feature.feature_id),
                    reason: "duplicate (source_id, feature_id) pair".to_string(),
                });
            }
        }

        Ok(Self {
            features: raw.features,
        })
    }

    fn validate_entry(index: usize, feature: &FeatureMetadata) -> Result<(), CatalogError> {
        let required = [
            ("feature_id", &feature.feature_id),
            ("source_id", &feature.source_id),
            ("display_name", &feature.display_name),
            ("category", &feature.category),
            ("description", &feature.description),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(CatalogError::ValidationError {
                    entry: if feature.feature_id.is_empty() {
                        format!("entry {index}")
                    } else {
                        format!("{}/{}", feature.source_id, feature.feature_id)
                    },
                    reason: format!("{name} must be non-empty"),
                });
            }
        }
        Ok(())
    }

    /// All features in declaration order.
    pub fn features(&self) -> &[FeatureMetadata] {
        &self.features
    }

    /// The declaration-ordered subset of features served by `source_id`.
    ///
    /// An unknown source id yields an empty slice rather than an error;
    /// source-id validation against the registry is the orchestrator's job.
    pub fn features_for_source(&self, source_id: &str) -> Vec<&FeatureMetadata> {
        self.features
            .iter()
            .filter(|f| f.source_id == source_id)
            .collect()
    }

    /// Distinct source ids referenced by the catalog, in declaration order.
    pub fn source_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        for feature in &self.features {
            if !ids.contains(&feature.source_id.as_str()) {
                ids.push(feature.source_id.as_str());
            }
        }
        ids
    }

    /// Number of catalog entries.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Errors that can occur when loading the catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Failed to parse catalog YAML
    #[error("catalog parse error: {0}")]
    ParseError(String),

    /// A catalog entry failed validation
    #[error("invalid catalog entry {entry}: {reason}")]
    ValidationError {
        /// `source_id/feature_id` of the offending entry, or its index when
        /// the id itself is missing.
        entry: String,
        /// What was wrong with it.
        reason: String,
    },
}
