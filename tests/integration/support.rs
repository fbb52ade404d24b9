//! Shared test doubles for pipeline integration tests

use async_trait::async_trait;
use organism_tractability::catalog::FeatureMetadata;
use organism_tractability::source::{
    FeatureSource, SourceError, SourceRegistry, SourceResult, DEFAULT_SOURCE_IDS,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Stub source returning a fixed payload and counting invocations.
pub struct StubSource {
    payload: Option<Value>,
    calls: AtomicUsize,
}

impl StubSource {
    pub fn returning(payload: Value) -> Self {
        Self {
            payload: Some(payload),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self {
            payload: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeatureSource for StubSource {
    async fn fetch(
        &self,
        _organism_id: i64,
        _organism_scientific_name: &str,
        _feature: &FeatureMetadata,
    ) -> SourceResult<Option<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

/// Stub source that always fails with a network error.
pub struct FailingSource;

#[async_trait]
impl FeatureSource for FailingSource {
    async fn fetch(
        &self,
        _organism_id: i64,
        _organism_scientific_name: &str,
        _feature: &FeatureMetadata,
    ) -> SourceResult<Option<Value>> {
        Err(SourceError::Network("connection reset".to_string()))
    }
}

/// Registry with a stub for every default source id, echoing the source id
/// in each payload.
pub fn stub_registry() -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    for source_id in DEFAULT_SOURCE_IDS {
        registry.register(
            source_id,
            Arc::new(StubSource::returning(serde_json::json!({
                "source": source_id,
                "count": 1,
            }))),
        );
    }
    registry
}
