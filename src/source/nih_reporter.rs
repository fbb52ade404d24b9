//! NIH RePORTER source
//!
//! Searches funded projects whose title, abstract, or terms mention the
//! organism. Only the first page is fetched, most recent project start
//! dates first. API documentation: <https://api.reporter.nih.gov/>.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{error_for_status, transport_error, FeatureSource, SourceError, SourceResult};
use crate::catalog::FeatureMetadata;
use crate::pipeline::config::{MAX_BACKOFF, MIN_BACKOFF};
use crate::pipeline::{RateLimiter, RetryPolicy};

const BASE_URL: &str = "https://api.reporter.nih.gov/v2";

/// NIH RePORTER rate limit: no more than one request per second.
const CALLS_PER_SECOND: f64 = 1.0;

/// Results per page. Pagination beyond the first page is out of scope.
const PAGE_LIMIT: u32 = 10;

/// Organization information for a funded project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization name.
    pub org_name: Option<String>,
    /// Organization country.
    pub org_country: Option<String>,
}

/// Principal investigator on a funded project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipalInvestigator {
    /// RePORTER profile id.
    pub profile_id: Option<i64>,
    /// Full name.
    pub full_name: Option<String>,
    /// Title.
    pub title: Option<String>,
}

/// Cherry-picked fields of one NIH project, per the RePORTER Project API
/// data element documentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NihProject {
    /// Fiscal year of the award.
    pub fiscal_year: Option<i32>,
    /// Awarded organization.
    pub organization: Option<Organization>,
    /// Award amount in dollars.
    pub award_amount: Option<f64>,
    /// Whether the project is currently active.
    pub is_active: Option<bool>,
    /// Principal investigators.
    pub principal_investigators: Option<Vec<PrincipalInvestigator>>,
    /// Project start date.
    pub project_start_date: Option<String>,
    /// Project end date.
    pub project_end_date: Option<String>,
    /// Project title.
    pub project_title: Option<String>,
    /// Public health relevance statement.
    pub phr_text: Option<String>,
    /// Link to the project detail page.
    pub project_detail_url: Option<String>,
}

/// Search metadata properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMetaProperties {
    /// URL of the equivalent web search.
    #[serde(rename = "URL")]
    pub url: Option<String>,
}

/// Search metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMeta {
    /// Total number of matching projects.
    pub total: u64,
    /// Additional properties.
    pub properties: SearchMetaProperties,
}

/// NIH RePORTER search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Search metadata.
    pub meta: SearchMeta,
    /// First page of matching projects.
    pub results: Vec<NihProject>,
}

/// Source adapter for NIH RePORTER.
pub struct NihReporterSource {
    client: Client,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
}

impl NihReporterSource {
    /// Construct the source. No credentials are required.
    pub fn new(client: &Client, max_attempts: u32) -> SourceResult<Self> {
        Ok(Self {
            client: client.clone(),
            rate_limiter: RateLimiter::new(CALLS_PER_SECOND)
                .map_err(|e| SourceError::Configuration(e.to_string()))?,
            retry: RetryPolicy::new(max_attempts, MIN_BACKOFF, MAX_BACKOFF),
        })
    }

    /// Shape the search payload for one query term.
    ///
    /// The API's sort differs from the RePORTER web interface; most recent
    /// project start dates are enforced here so results are stable.
    fn search_payload(query: &str) -> Value {
        json!({
            "criteria": {
                "use_relevance": true,
                "advanced_text_search": {
                    "operator": "and",
                    "search_field": "projecttitle,abstracttext,terms",
                    "search_text": query,
                },
            },
            "offset": 0,
            "limit": PAGE_LIMIT,
            "sort_field": "project_start_date",
            "sort_order": "desc",
        })
    }

    /// Search for NIH projects mentioning `query`.
    pub async fn search_projects(&self, query: &str) -> SourceResult<SearchResponse> {
        let url = format!("{BASE_URL}/projects/search");
        let payload = Self::search_payload(query);

        self.retry
            .run(
                || async {
                    self.rate_limiter.wait().await;
                    let response = self
                        .client
                        .post(&url)
                        .json(&payload)
                        .send()
                        .await
                        .map_err(transport_error)?;
                    let response = error_for_status(response).await?;
                    response
                        .json()
                        .await
                        .map_err(|e| SourceError::Parse(format!("projects search response: {e}")))
                },
                SourceError::is_transient,
            )
            .await
    }
}

#[async_trait]
impl FeatureSource for NihReporterSource {
    async fn fetch(
        &self,
        _organism_id: i64,
        organism_scientific_name: &str,
        _feature: &FeatureMetadata,
    ) -> SourceResult<Option<Value>> {
        let response = self.search_projects(organism_scientific_name).await?;
        let value =
            serde_json::to_value(response).map_err(|e| SourceError::Parse(e.to_string()))?;
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_payload_shape() {
        let payload = NihReporterSource::search_payload("Chlorella vulgaris");
        assert_eq!(payload["limit"], 10);
        assert_eq!(payload["offset"], 0);
        assert_eq!(payload["sort_field"], "project_start_date");
        assert_eq!(payload["sort_order"], "desc");
        assert_eq!(
            payload["criteria"]["advanced_text_search"]["search_text"],
            "Chlorella vulgaris"
        );
        assert_eq!(
            payload["criteria"]["advanced_text_search"]["search_field"],
            "projecttitle,abstracttext,terms"
        );
    }

    #[test]
    fn test_response_deserializes_with_missing_optionals() {
        let raw = r#"{
            "meta": {"total": 2, "properties": {"URL": "https://reporter.nih.gov/search/x"}},
            "results": [
                {"fiscal_year": 2024, "project_title": "Algal biofuels", "award_amount": 350000.0},
                {"organization": {"org_name": "Example University", "org_country": "UNITED STATES"}}
            ]
        }"#;
        let response: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.meta.total, 2);
        assert_eq!(response.results.len(), 2);
        assert_eq!(
            response.results[0].project_title.as_deref(),
            Some("Algal biofuels")
        );
        assert!(response.results[1].fiscal_year.is_none());
    }

    #[test]
    fn test_meta_url_keeps_wire_field_name() {
        let meta = SearchMeta {
            total: 0,
            properties: SearchMetaProperties {
                url: Some("https://reporter.nih.gov/search/x".to_string()),
            },
        };
        let value = serde_json::to_value(meta).unwrap();
        assert!(value["properties"]["URL"].is_string());
    }
}
