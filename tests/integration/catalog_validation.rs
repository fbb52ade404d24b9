//! Integration tests for catalog loading and validation

use organism_tractability::catalog::{CatalogError, FeatureCatalog};
use organism_tractability::source::DEFAULT_SOURCE_IDS;

#[test]
fn test_embedded_catalog_loads_and_is_non_empty() {
    let catalog = FeatureCatalog::load().unwrap();
    assert!(!catalog.is_empty());
}

#[test]
fn test_every_catalog_source_has_an_adapter() {
    let catalog = FeatureCatalog::load().unwrap();
    for source_id in catalog.source_ids() {
        assert!(
            DEFAULT_SOURCE_IDS.contains(&source_id),
            "catalog references unregistered source {source_id}"
        );
    }
}

#[test]
fn test_every_default_source_serves_at_least_one_feature() {
    let catalog = FeatureCatalog::load().unwrap();
    for source_id in DEFAULT_SOURCE_IDS {
        assert!(
            !catalog.features_for_source(source_id).is_empty(),
            "no catalog entries for {source_id}"
        );
    }
}

#[test]
fn test_missing_description_fails_the_entire_load() {
    let yaml = r#"
features:
  - feature_id: pubmed
    source_id: ncbi
    display_name: PubMed
    category: Literature
    description: Literature count.
  - feature_id: projects
    source_id: nih_reporter
    display_name: NIH projects
    category: Funding
    description: ""
"#;
    let err = FeatureCatalog::from_yaml(yaml).unwrap_err();
    assert!(matches!(err, CatalogError::ValidationError { .. }));
    // No partial catalog survives a failed load.
}

#[test]
fn test_malformed_yaml_is_a_parse_error() {
    let err = FeatureCatalog::from_yaml("features: {not: [a, list").unwrap_err();
    assert!(matches!(err, CatalogError::ParseError(_)));
}

#[test]
fn test_source_filter_preserves_declaration_order() {
    let catalog = FeatureCatalog::load().unwrap();
    let all_ids: Vec<&str> = catalog
        .features()
        .iter()
        .filter(|f| f.source_id == "ncbi")
        .map(|f| f.feature_id.as_str())
        .collect();
    let filtered_ids: Vec<&str> = catalog
        .features_for_source("ncbi")
        .iter()
        .map(|f| f.feature_id.as_str())
        .collect();
    assert_eq!(all_ids, filtered_ids);
}

#[test]
fn test_answer_features_carry_templates() {
    let catalog = FeatureCatalog::load().unwrap();
    for feature in catalog.features_for_source("exa_answer") {
        let template = feature.query.as_deref().unwrap_or_default();
        assert!(
            template.contains("{organism}"),
            "feature {} has no organism placeholder",
            feature.feature_id
        );
    }
}
