//! protocols.io source
//!
//! Searches public protocols matching the organism name. The API searches
//! the full key as a phrase; the included web search URL uses broader OR
//! matching and will generally show more hits. API documentation:
//! <https://apidoc.protocols.io/>.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    error_for_status, percent_encode, transport_error, FeatureSource, SourceError, SourceResult,
};
use crate::catalog::FeatureMetadata;
use crate::pipeline::config::{MAX_BACKOFF, MIN_BACKOFF};
use crate::pipeline::{RateLimiter, RetryPolicy};

const BASE_URL: &str = "https://www.protocols.io/api/v3";

/// protocols.io enforces 100 requests per minute per user (~1.67 req/s).
const CALLS_PER_SECOND: f64 = 1.67;

/// Results per page; only the first page is fetched.
const PAGE_SIZE: u32 = 10;

/// One protocol from protocols.io.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    /// Protocol title.
    pub title: String,
    /// Protocol URL.
    pub url: String,
}

/// Search results reshaped for output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolSearchResults {
    /// First page of matching protocols.
    pub protocols: Vec<Protocol>,
    /// Total matching protocols across all pages.
    pub total_results: u64,
    /// Current page as reported by the API (1-based).
    pub current_page: u64,
    /// Total pages.
    pub total_pages: u64,
    /// HTTP status of the search response.
    pub status_code: u16,
    /// Broader-matching web search URL for manual follow-up.
    pub web_search_url: String,
}

/// Wire shape of the protocol list response.
#[derive(Debug, Deserialize)]
struct RawProtocolList {
    #[serde(default)]
    items: Vec<Protocol>,
    #[serde(default)]
    pagination: RawPagination,
}

#[derive(Debug, Default, Deserialize)]
struct RawPagination {
    #[serde(default)]
    total_results: u64,
    #[serde(default)]
    current_page: u64,
    #[serde(default)]
    total_pages: u64,
}

/// Source adapter for protocols.io.
pub struct ProtocolsIoSource {
    client: Client,
    access_token: String,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
}

impl ProtocolsIoSource {
    /// Construct from an explicit client-access token.
    pub fn new(client: &Client, access_token: String, max_attempts: u32) -> SourceResult<Self> {
        Ok(Self {
            client: client.clone(),
            access_token,
            rate_limiter: RateLimiter::new(CALLS_PER_SECOND)
                .map_err(|e| SourceError::Configuration(e.to_string()))?,
            retry: RetryPolicy::new(max_attempts, MIN_BACKOFF, MAX_BACKOFF),
        })
    }

    /// Construct reading `PROTOCOLS_IO_API_CLIENT_ACCESS_TOKEN` from the
    /// environment.
    pub fn from_env(client: &Client, max_attempts: u32) -> SourceResult<Self> {
        let access_token = std::env::var("PROTOCOLS_IO_API_CLIENT_ACCESS_TOKEN").map_err(|_| {
            SourceError::Configuration(
                "PROTOCOLS_IO_API_CLIENT_ACCESS_TOKEN must be set".to_string(),
            )
        })?;
        Self::new(client, access_token, max_attempts)
    }

    /// The protocols.io web search URL for a search term.
    fn web_search_url(search_term: &str) -> String {
        format!(
            "https://www.protocols.io/search?q={}",
            percent_encode(search_term)
        )
    }

    /// Search public protocols for `key`, first page only.
    ///
    /// The API's pagination is 0-based despite its documentation: page_id=0
    /// is the first page and comes back as current_page=1.
    pub async fn search_protocols(&self, key: &str) -> SourceResult<ProtocolSearchResults> {
        let url = format!("{BASE_URL}/protocols");
        let params = [
            ("key", key.to_string()),
            ("page_size", PAGE_SIZE.clamp(1, 100).to_string()),
            ("page_id", "0".to_string()),
            ("order_field", "activity".to_string()),
            ("order_dir", "desc".to_string()),
            // Client-access tokens can only reach public data.
            ("filter", "public".to_string()),
        ];

        let (status_code, raw): (u16, RawProtocolList) = self
            .retry
            .run(
                || async {
                    self.rate_limiter.wait().await;
                    let response = self
                        .client
                        .get(&url)
                        .bearer_auth(&self.access_token)
                        .header("Accept", "application/json")
                        .query(&params)
                        .send()
                        .await
                        .map_err(transport_error)?;
                    let response = error_for_status(response).await?;
                    let status_code = response.status().as_u16();
                    let raw = response
                        .json()
                        .await
                        .map_err(|e| SourceError::Parse(format!("protocol list response: {e}")))?;
                    Ok((status_code, raw))
                },
                SourceError::is_transient,
            )
            .await?;

        Ok(ProtocolSearchResults {
            protocols: raw.items,
            total_results: raw.pagination.total_results,
            current_page: raw.pagination.current_page,
            total_pages: raw.pagination.total_pages,
            status_code,
            web_search_url: Self::web_search_url(key),
        })
    }
}

#[async_trait]
impl FeatureSource for ProtocolsIoSource {
    async fn fetch(
        &self,
        _organism_id: i64,
        organism_scientific_name: &str,
        _feature: &FeatureMetadata,
    ) -> SourceResult<Option<Value>> {
        let results = self.search_protocols(organism_scientific_name).await?;
        let value =
            serde_json::to_value(results).map_err(|e| SourceError::Parse(e.to_string()))?;
        Ok(Some(value))
    }
}
