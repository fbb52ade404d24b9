//! Integration tests for the fetch orchestrator

use organism_tractability::catalog::FeatureCatalog;
use organism_tractability::pipeline::{FeaturesPipeline, PipelineError};
use organism_tractability::source::{SourceRegistry, DEFAULT_SOURCE_IDS};
use serde_json::json;
use std::sync::Arc;

use crate::integration::support::{stub_registry, FailingSource, StubSource};

fn stub_pipeline() -> FeaturesPipeline {
    let catalog = FeatureCatalog::load_embedded().unwrap();
    FeaturesPipeline::new(catalog, stub_registry()).unwrap()
}

#[tokio::test]
async fn test_single_source_filter_restricts_rows() {
    let pipeline = stub_pipeline();
    let expected = pipeline.catalog().features_for_source("ncbi").len();

    let rows = pipeline
        .fetch_features_for_organism(3077, "Chlorella vulgaris", Some(&["ncbi".to_string()]))
        .await
        .unwrap();

    assert_eq!(rows.len(), expected);
    assert!(rows.iter().all(|r| r.source_id == "ncbi"));
    assert!(rows.iter().all(|r| r.organism_id == 3077));
}

#[tokio::test]
async fn test_rows_follow_catalog_declaration_order() {
    let pipeline = stub_pipeline();
    let expected_ids: Vec<String> = pipeline
        .catalog()
        .features_for_source("ncbi")
        .iter()
        .map(|f| f.feature_id.clone())
        .collect();

    let rows = pipeline
        .fetch_features_for_organism(3077, "Chlorella vulgaris", Some(&["ncbi".to_string()]))
        .await
        .unwrap();
    let row_ids: Vec<String> = rows.iter().map(|r| r.feature_id.clone()).collect();

    assert_eq!(row_ids, expected_ids);
}

#[tokio::test]
async fn test_all_sources_processed_in_registry_order() {
    let pipeline = stub_pipeline();

    let rows = pipeline
        .fetch_features_for_organism(562, "Escherichia coli", None)
        .await
        .unwrap();

    assert_eq!(rows.len(), pipeline.catalog().len());

    // Row sources must appear in registration order, each source's block
    // contiguous.
    let mut seen_order: Vec<&str> = Vec::new();
    for row in &rows {
        if seen_order.last() != Some(&row.source_id.as_str()) {
            seen_order.push(row.source_id.as_str());
        }
    }
    assert_eq!(seen_order, DEFAULT_SOURCE_IDS.to_vec());
}

#[tokio::test]
async fn test_unknown_source_id_is_an_invalid_argument() {
    let pipeline = stub_pipeline();

    let err = pipeline
        .fetch_features_for_organism(
            3077,
            "Chlorella vulgaris",
            Some(&["not_a_real_source".to_string()]),
        )
        .await
        .unwrap_err();

    match &err {
        PipelineError::InvalidSourceIds { invalid, available } => {
            assert_eq!(invalid, &vec!["not_a_real_source".to_string()]);
            assert_eq!(available.len(), DEFAULT_SOURCE_IDS.len());
        }
        other => panic!("expected InvalidSourceIds, got {other:?}"),
    }
    // The message names the bad id and lists what is available.
    let message = err.to_string();
    assert!(message.contains("not_a_real_source"));
    assert!(message.contains("ncbi"));
}

#[tokio::test]
async fn test_empty_result_still_produces_a_row() {
    let catalog = FeatureCatalog::load_embedded().unwrap();
    let mut registry = SourceRegistry::new();
    for source_id in DEFAULT_SOURCE_IDS {
        registry.register(source_id, Arc::new(StubSource::empty()));
    }
    let pipeline = FeaturesPipeline::new(catalog, registry).unwrap();

    let rows = pipeline
        .fetch_features_for_organism(3077, "Chlorella vulgaris", Some(&["ncbi".to_string()]))
        .await
        .unwrap();

    assert!(!rows.is_empty());
    // Absence of data is recorded as an empty object, not omitted.
    assert!(rows.iter().all(|r| r.fetched_object == json!({})));
}

#[tokio::test]
async fn test_source_failure_aborts_the_organism_fetch() {
    let catalog = FeatureCatalog::load_embedded().unwrap();
    let mut registry = SourceRegistry::new();
    for source_id in DEFAULT_SOURCE_IDS {
        if source_id == "atcc" {
            registry.register(source_id, Arc::new(FailingSource));
        } else {
            registry.register(source_id, Arc::new(StubSource::returning(json!({"ok": true}))));
        }
    }
    let pipeline = FeaturesPipeline::new(catalog, registry).unwrap();

    let result = pipeline
        .fetch_features_for_organism(3077, "Chlorella vulgaris", None)
        .await;

    // No partial row set comes back for the organism.
    assert!(matches!(result, Err(PipelineError::Source(_))));
}

#[tokio::test]
async fn test_catalog_source_without_adapter_fails_construction() {
    let catalog = FeatureCatalog::load_embedded().unwrap();
    let mut registry = SourceRegistry::new();
    // Leave out every source except ncbi.
    registry.register("ncbi", Arc::new(StubSource::empty()));

    let err = FeaturesPipeline::new(catalog, registry).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::UnregisteredCatalogSource(_)
    ));
}
