//! Fetch orchestrator: iterates organisms × sources × features and emits
//! normalized feature rows.

use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info};

use crate::catalog::FeatureCatalog;
use crate::input::read_organisms;
use crate::metrics::FetchMetrics;
use crate::output::csv::CsvFeatureWriter;
use crate::output::{FeatureRowWriter, OutputWriter};
use crate::pipeline::PipelineError;
use crate::source::{FeatureSource, SourceRegistry};
use crate::FeatureRow;

/// Orchestrates fetching features for organisms.
///
/// Holds the read-only catalog and registry for the lifetime of the batch.
/// Within one organism, rows are produced in (source-registration-order,
/// catalog-declaration-order): calls are issued and awaited sequentially,
/// so the ordering is deterministic and independent of network timing.
///
/// A single source/feature failure (after the adapter's own retries) aborts
/// the whole per-organism fetch and propagates: callers get either the
/// complete row set for an organism or none of it.
pub struct FeaturesPipeline {
    catalog: FeatureCatalog,
    registry: SourceRegistry,
}

impl std::fmt::Debug for FeaturesPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeaturesPipeline")
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

impl FeaturesPipeline {
    /// Create a pipeline over a validated catalog and source registry.
    ///
    /// # Errors
    /// Fails if any catalog entry references a source id with no registered
    /// adapter.
    pub fn new(catalog: FeatureCatalog, registry: SourceRegistry) -> Result<Self, PipelineError> {
        for source_id in catalog.source_ids() {
            if !registry.contains(source_id) {
                return Err(PipelineError::UnregisteredCatalogSource(
                    source_id.to_string(),
                ));
            }
        }
        Ok(Self { catalog, registry })
    }

    /// The catalog this pipeline fetches from.
    pub fn catalog(&self) -> &FeatureCatalog {
        &self.catalog
    }

    /// The source registry this pipeline dispatches to.
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Resolve the sources to process, in registry order.
    ///
    /// With `source_ids` given, restricts processing to exactly those ids
    /// and fails listing any that are not registered; otherwise every
    /// registered source is selected.
    fn select_sources<'a>(
        &'a self,
        source_ids: Option<&'a [String]>,
    ) -> Result<Vec<&'a str>, PipelineError> {
        match source_ids {
            None => Ok(self.registry.source_ids()),
            Some(ids) => {
                let invalid: Vec<String> = ids
                    .iter()
                    .filter(|id| !self.registry.contains(id))
                    .cloned()
                    .collect();
                if !invalid.is_empty() {
                    return Err(PipelineError::InvalidSourceIds {
                        invalid,
                        available: self
                            .registry
                            .source_ids()
                            .iter()
                            .map(|s| s.to_string())
                            .collect(),
                    });
                }
                Ok(ids.iter().map(String::as_str).collect())
            }
        }
    }

    /// Fetch all configured features for a single organism.
    ///
    /// Emits one [`FeatureRow`] per (source, feature) pair regardless of
    /// whether the source returned data — absence of data is itself a
    /// recorded, queryable fact.
    pub async fn fetch_features_for_organism(
        &self,
        organism_id: i64,
        organism_scientific_name: &str,
        source_ids: Option<&[String]>,
    ) -> Result<Vec<FeatureRow>, PipelineError> {
        let selected = self.select_sources(source_ids)?;
        let mut rows = Vec::new();

        for source_id in selected {
            let source = self.registry.get(source_id).ok_or_else(|| {
                // Unreachable after select_sources, but no panics in the core.
                PipelineError::InvalidSourceIds {
                    invalid: vec![source_id.to_string()],
                    available: self
                        .registry
                        .source_ids()
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                }
            })?;

            for feature in self.catalog.features_for_source(source_id) {
                info!(
                    organism = %organism_scientific_name,
                    taxid = organism_id,
                    feature_id = %feature.feature_id,
                    source_id = %source_id,
                    "Fetching feature"
                );

                let fetch_metrics = FetchMetrics::start(source_id, &feature.feature_id);
                let result = source
                    .fetch(organism_id, organism_scientific_name, feature)
                    .await;
                match &result {
                    Ok(_) => fetch_metrics.record_success(),
                    Err(e) => fetch_metrics.record_failure(&e.to_string()),
                }

                rows.push(FeatureRow {
                    organism_id,
                    feature_id: feature.feature_id.clone(),
                    source_id: feature.source_id.clone(),
                    fetched_object: normalize_fetched(result?),
                });
            }
        }

        Ok(rows)
    }

    /// Batch driver: read organisms from an input CSV and write long-format
    /// feature rows to an output CSV, in organism-input order.
    ///
    /// The entire organism roster is validated (non-empty name, integer id,
    /// reported with its 1-based line number) before any network call is
    /// made, and requested source ids are checked against the registry
    /// before any row is written. Returns the number of rows written.
    ///
    /// The first organism whose fetch fails aborts the whole run; rows for
    /// organisms fetched before it remain in the output file.
    pub async fn run_csv(
        &self,
        input_csv_path: &Path,
        output_csv_path: &Path,
        source_ids: Option<&[String]>,
    ) -> Result<u64, PipelineError> {
        self.select_sources(source_ids)?;
        let organisms = read_organisms(input_csv_path)?;
        info!(
            organisms = organisms.len(),
            input = %input_csv_path.display(),
            "Organism roster validated"
        );

        let mut writer = CsvFeatureWriter::new(output_csv_path)?;
        let mut rows_written = 0u64;

        for organism in &organisms {
            let rows = self
                .fetch_features_for_organism(
                    organism.organism_id,
                    &organism.scientific_name,
                    source_ids,
                )
                .await?;
            debug!(
                organism = %organism.scientific_name,
                rows = rows.len(),
                "Organism fetch completed"
            );
            writer.write_rows(&rows)?;
            rows_written += rows.len() as u64;
        }

        writer.close()?;
        Ok(rows_written)
    }
}

/// Normalize an adapter result into the payload stored on a row: no data
/// becomes an empty record, structured objects and any other values pass
/// through unchanged.
fn normalize_fetched(value: Option<Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(value) => value,
    }
}
