//! End-to-end tests for the CSV batch driver

use organism_tractability::catalog::FeatureCatalog;
use organism_tractability::pipeline::{FeaturesPipeline, PipelineError};
use organism_tractability::source::{SourceRegistry, DEFAULT_SOURCE_IDS};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;

use crate::integration::support::StubSource;

fn write_input_csv(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("organisms.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

/// Registry of counting stubs, returning the handles for call assertions.
fn counting_registry(payload: serde_json::Value) -> (SourceRegistry, Vec<Arc<StubSource>>) {
    let mut registry = SourceRegistry::new();
    let mut stubs = Vec::new();
    for source_id in DEFAULT_SOURCE_IDS {
        let stub = Arc::new(StubSource::returning(payload.clone()));
        registry.register(source_id, stub.clone());
        stubs.push(stub);
    }
    (registry, stubs)
}

#[tokio::test]
async fn test_run_csv_writes_rows_in_organism_order() {
    let dir = tempfile::TempDir::new().unwrap();
    let input = write_input_csv(
        &dir,
        "organism_scientific_name,organism_id\nChlorella vulgaris,3077\nEscherichia coli,562\n",
    );
    let output = dir.path().join("features.csv");

    let catalog = FeatureCatalog::load_embedded().unwrap();
    let features_per_organism = catalog.len() as u64;
    let (registry, _) = counting_registry(json!({"count": 1}));
    let pipeline = FeaturesPipeline::new(catalog, registry).unwrap();

    let rows_written = pipeline.run_csv(&input, &output, None).await.unwrap();
    assert_eq!(rows_written, 2 * features_per_organism);

    let mut reader = csv::Reader::from_path(&output).unwrap();
    assert_eq!(
        reader.headers().unwrap(),
        &csv::StringRecord::from(vec![
            "organism_id",
            "feature_id",
            "source_id",
            "fetched_object"
        ])
    );

    let records: Vec<csv::StringRecord> =
        reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(records.len() as u64, rows_written);
    // All of the first organism's rows precede the second organism's.
    let first_block = &records[..features_per_organism as usize];
    let second_block = &records[features_per_organism as usize..];
    assert!(first_block.iter().all(|r| r.get(0) == Some("3077")));
    assert!(second_block.iter().all(|r| r.get(0) == Some("562")));
}

#[tokio::test]
async fn test_fetched_object_round_trips_through_output_csv() {
    let dir = tempfile::TempDir::new().unwrap();
    let input = write_input_csv(
        &dir,
        "organism_scientific_name,organism_id\nChlorella vulgaris,3077\n",
    );
    let output = dir.path().join("features.csv");

    let catalog = FeatureCatalog::load_embedded().unwrap();
    let (registry, _) = counting_registry(json!({"b": 1, "a": 2}));
    let pipeline = FeaturesPipeline::new(catalog, registry).unwrap();

    pipeline
        .run_csv(&input, &output, Some(&["ncbi".to_string()]))
        .await
        .unwrap();

    let mut reader = csv::Reader::from_path(&output).unwrap();
    for record in reader.records() {
        let record = record.unwrap();
        let field = record.get(3).unwrap();
        // Keys are serialized in sorted order and parse back value-equal.
        assert_eq!(field, r#"{"a":2,"b":1}"#);
        let parsed: serde_json::Value = serde_json::from_str(field).unwrap();
        assert_eq!(parsed, json!({"b": 1, "a": 2}));
    }
}

#[tokio::test]
async fn test_missing_id_column_fails_before_any_fetch() {
    let dir = tempfile::TempDir::new().unwrap();
    let input = write_input_csv(&dir, "organism_scientific_name\nChlorella vulgaris\n");
    let output = dir.path().join("features.csv");

    let catalog = FeatureCatalog::load_embedded().unwrap();
    let (registry, stubs) = counting_registry(json!({}));
    let pipeline = FeaturesPipeline::new(catalog, registry).unwrap();

    let err = pipeline.run_csv(&input, &output, None).await.unwrap_err();
    assert!(matches!(err, PipelineError::Input(_)));
    assert!(err.to_string().contains("organism_id"));

    // No adapter ran and no output file was created.
    assert!(stubs.iter().all(|s| s.calls() == 0));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_malformed_row_reports_line_number_before_any_fetch() {
    let dir = tempfile::TempDir::new().unwrap();
    let input = write_input_csv(
        &dir,
        "organism_scientific_name,organism_id\nChlorella vulgaris,3077\nEscherichia coli,not-a-taxid\n",
    );
    let output = dir.path().join("features.csv");

    let catalog = FeatureCatalog::load_embedded().unwrap();
    let (registry, stubs) = counting_registry(json!({}));
    let pipeline = FeaturesPipeline::new(catalog, registry).unwrap();

    let err = pipeline.run_csv(&input, &output, None).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("row 3"));
    assert!(message.contains("not-a-taxid"));

    // Roster validation is all-or-nothing: even the valid first organism
    // must not have been fetched.
    assert!(stubs.iter().all(|s| s.calls() == 0));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_invalid_source_id_fails_before_reading_input() {
    let dir = tempfile::TempDir::new().unwrap();
    // Deliberately malformed input: the source-id check must fire first.
    let input = write_input_csv(&dir, "wrong_header\nvalue\n");
    let output = dir.path().join("features.csv");

    let catalog = FeatureCatalog::load_embedded().unwrap();
    let (registry, _) = counting_registry(json!({}));
    let pipeline = FeaturesPipeline::new(catalog, registry).unwrap();

    let err = pipeline
        .run_csv(&input, &output, Some(&["bogus".to_string()]))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidSourceIds { .. }));
    assert!(!output.exists());
}
