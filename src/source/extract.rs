//! Web-extraction service client
//!
//! Thin wrapper over the Firecrawl extraction API: renders a page and pulls
//! structured data out of it under a natural-language prompt with an
//! optional JSON schema. Callers layer their own retry policy on top; this
//! client only enforces the account-wide concurrency cap.

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{error_for_status, transport_error, SourceError, SourceResult};
use crate::pipeline::ConcurrencyLimiter;

const BASE_URL: &str = "https://api.firecrawl.dev/v2";

/// Standard plan: 50 concurrent browsers.
const MAX_CONCURRENT_EXTRACTIONS: usize = 50;

/// Extractions render full pages; allow far longer than API calls.
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(120);

/// Wire envelope for extraction responses.
#[derive(Debug, Deserialize)]
struct ExtractEnvelope {
    #[serde(default)]
    data: Option<Value>,
}

/// Client for the web-extraction service.
pub struct ExtractClient {
    client: Client,
    api_key: String,
    base_url: String,
    concurrency: ConcurrencyLimiter,
}

impl ExtractClient {
    /// Construct from an explicit API key.
    pub fn new(client: &Client, api_key: String) -> SourceResult<Self> {
        Ok(Self {
            client: client.clone(),
            api_key,
            base_url: BASE_URL.to_string(),
            concurrency: ConcurrencyLimiter::new(MAX_CONCURRENT_EXTRACTIONS)
                .map_err(|e| SourceError::Configuration(e.to_string()))?,
        })
    }

    /// Construct reading `FIRECRAWL_API_KEY` from the environment.
    pub fn from_env(client: &Client) -> SourceResult<Self> {
        let api_key = std::env::var("FIRECRAWL_API_KEY")
            .map_err(|_| SourceError::Configuration("FIRECRAWL_API_KEY must be set".to_string()))?;
        Self::new(client, api_key)
    }

    /// Run structured extraction for a single URL.
    ///
    /// Returns the extracted `data` payload. A response with no usable data
    /// is an [`SourceError::Extraction`] so callers can retry it.
    pub async fn extract(
        &self,
        url: &str,
        prompt: &str,
        schema: Option<&Value>,
    ) -> SourceResult<Value> {
        let _slot = self
            .concurrency
            .acquire()
            .await
            .map_err(|e| SourceError::Configuration(e.to_string()))?;

        let mut payload = json!({
            "urls": [url],
            "prompt": prompt,
        });
        if let Some(schema) = schema {
            payload["schema"] = schema.clone();
        }

        let response = self
            .client
            .post(format!("{}/extract", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(EXTRACT_TIMEOUT)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;
        let response = error_for_status(response).await?;

        let envelope: ExtractEnvelope = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("extraction response: {e}")))?;

        match envelope.data {
            Some(data) if !data.is_null() => Ok(data),
            _ => Err(SourceError::Extraction(
                "extraction returned no data".to_string(),
            )),
        }
    }
}
