//! NCBI E-utilities source
//!
//! Runs `esearch` against the database named by each feature's
//! `feature_id` and reports the record count together with a public search
//! URL for manual follow-up. API documentation:
//! <https://www.ncbi.nlm.nih.gov/books/NBK25501/>.

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

const BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const SEARCH_ENDPOINT: &str = "/esearch.fcgi";
const TOOL_ID: &str = "organism_tractability";

/// NCBI allows up to 10 requests per second with an API key.
const CALLS_PER_SECOND: f64 = 10.0;

/// First-page result cap; only the count is consumed.
const RETMAX: u32 = 5;

/// Result of one NCBI database search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NcbiSearchResult {
    /// Public web search URL equivalent to the API query.
    pub search_url: String,
    /// Total number of matching records.
    pub count: u64,
}

/// Wire envelope for esearch JSON responses.
#[derive(Debug, Deserialize)]
struct EsearchEnvelope {
    esearchresult: EsearchResult,
}

#[derive(Debug, Deserialize)]
struct EsearchResult {
    // NCBI returns the count as a JSON string.
    count: String,
}

/// Source adapter for NCBI E-utilities.
pub struct NcbiSource {
    client: Client,
    api_key: String,
    api_email: String,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
}

impl NcbiSource {
    /// Construct from explicit credentials.
    pub fn new(
        client: &Client,
        api_key: String,
        api_email: String,
        max_attempts: u32,
    ) -> SourceResult<Self> {
        Ok(Self {
            client: client.clone(),
            api_key,
            api_email,
            rate_limiter: RateLimiter::new(CALLS_PER_SECOND)
                .map_err(|e| SourceError::Configuration(e.to_string()))?,
            retry: RetryPolicy::new(max_attempts, MIN_BACKOFF, MAX_BACKOFF),
        })
    }

    /// Construct reading `NCBI_API_KEY` and `NCBI_API_EMAIL` from the
    /// environment. Fails before any network traffic if either is missing.
    pub fn from_env(client: &Client, max_attempts: u32) -> SourceResult<Self> {
        let api_key = std::env::var("NCBI_API_KEY")
            .map_err(|_| SourceError::Configuration("NCBI_API_KEY must be set".to_string()))?;
        let api_email = std::env::var("NCBI_API_EMAIL")
            .map_err(|_| SourceError::Configuration("NCBI_API_EMAIL must be set".to_string()))?;
        Self::new(client, api_key, api_email, max_attempts)
    }

    /// Build the search term for a feature's configured query type.
    ///
    /// `taxonomy_id` databases search `txid{id}[Organism]`; everything else
    /// quotes each name token and AND-joins so multi-word names (e.g.
    /// "Hornefia sp.") search as `"Hornefia" AND "sp."`.
    fn search_term(
        feature: &FeatureMetadata,
        organism_scientific_name: &str,
        organism_id: i64,
    ) -> String {
        match feature.organism_query_type.as_deref() {
            Some("taxonomy_id") => format!("txid{organism_id}[Organism]"),
            _ => quoted_and_term(organism_scientific_name),
        }
    }

    /// Build the public web search URL for a feature's database.
    fn search_url(
        feature: &FeatureMetadata,
        organism_scientific_name: &str,
        organism_id: i64,
    ) -> String {
        let term = Self::search_term(feature, organism_scientific_name, organism_id);
        let encoded = percent_encode(&term);

        if feature.feature_id == "pubmed" {
            format!("https://pubmed.ncbi.nlm.nih.gov/?term={encoded}&sort=date&ac=yes")
        } else {
            format!(
                "https://www.ncbi.nlm.nih.gov/{}/?term={encoded}",
                feature.feature_id
            )
        }
    }

    /// Search one NCBI database and return its record count with the
    /// matching web search URL.
    pub async fn search(
        &self,
        organism_id: i64,
        organism_scientific_name: &str,
        feature: &FeatureMetadata,
    ) -> SourceResult<NcbiSearchResult> {
        let term = Self::search_term(feature, organism_scientific_name, organism_id);
        let search_url = Self::search_url(feature, organism_scientific_name, organism_id);
        let url = format!("{BASE_URL}{SEARCH_ENDPOINT}");

        let params = [
            ("tool", TOOL_ID.to_string()),
            ("email", self.api_email.clone()),
            ("api_key", self.api_key.clone()),
            ("db", feature.feature_id.clone()),
            ("term", term),
            ("retmode", "json".to_string()),
            ("retmax", RETMAX.to_string()),
        ];

        let envelope: EsearchEnvelope = self
            .retry
            .run(
                || async {
                    self.rate_limiter.wait().await;
                    let response = self
                        .client
                        .get(&url)
                        .query(&params)
                        .send()
                        .await
                        .map_err(transport_error)?;
                    let response = error_for_status(response).await?;
                    response
                        .json()
                        .await
                        .map_err(|e| SourceError::Parse(format!("esearch response: {e}")))
                },
                SourceError::is_transient,
            )
            .await?;

        let count = envelope
            .esearchresult
            .count
            .parse::<u64>()
            .map_err(|e| SourceError::Parse(format!("esearch count: {e}")))?;

        Ok(NcbiSearchResult { search_url, count })
    }
}

/// Quote each token and AND-join so every token must match.
fn quoted_and_term(name: &str) -> String {
    let tokens: Vec<String> = name
        .split_whitespace()
        .map(|t| format!("\"{t}\""))
        .collect();
    if tokens.is_empty() {
        name.to_string()
    } else {
        tokens.join(" AND ")
    }
}

#[async_trait]
impl FeatureSource for NcbiSource {
    async fn fetch(
        &self,
        organism_id: i64,
        organism_scientific_name: &str,
        feature: &FeatureMetadata,
    ) -> SourceResult<Option<Value>> {
        let result = self
            .search(organism_id, organism_scientific_name, feature)
            .await?;
        let value =
            serde_json::to_value(result).map_err(|e| SourceError::Parse(e.to_string()))?;
        Ok(Some(value))
    }
}
