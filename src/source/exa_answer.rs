//! Exa answer source
//!
//! Asks the Exa answer API (web search + LLM) a feature-specific question
//! about the organism. Each catalog entry supplies a query template with an
//! `{organism}` placeholder and, optionally, a closed answer vocabulary
//! that is enforced through the response schema.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::{error_for_status, transport_error, FeatureSource, SourceError, SourceResult};
use crate::catalog::FeatureMetadata;
use crate::pipeline::config::{MAX_BACKOFF, MIN_BACKOFF};
use crate::pipeline::{RateLimiter, RetryPolicy};

const ANSWER_ENDPOINT: &str = "https://api.exa.ai/answer";

/// Exa allows 5 queries per second.
const CALLS_PER_SECOND: f64 = 5.0;

/// One citation backing an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Citation id.
    pub id: String,
    /// Page title.
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Snippet of the cited text.
    pub snippet: Option<String>,
    /// Preview image URL.
    pub image: Option<String>,
    /// Publication date.
    #[serde(rename = "publishedDate")]
    pub published_date: Option<String>,
    /// Relevance score.
    pub score: Option<f64>,
    /// Favicon URL.
    pub favicon: Option<String>,
}

/// Structured answer content enforced by the output schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerContent {
    /// Scientific reasoning and evidence for the answer.
    pub reasoning: String,
    /// Confidence level: low, medium, or high.
    pub confidence: String,
    /// The answer itself.
    pub answer: String,
}

/// Full answer API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExaAnswer {
    /// Request id assigned by the API.
    #[serde(rename = "requestId")]
    pub request_id: String,
    /// The structured answer.
    pub answer: AnswerContent,
    /// Citations backing the answer.
    pub citations: Vec<Citation>,
    /// Cost breakdown in dollars.
    #[serde(rename = "costDollars", default)]
    pub cost_dollars: BTreeMap<String, f64>,
}

/// Build the output schema for a query, extending the base
/// answer/reasoning/confidence object with the feature's answer vocabulary
/// when one is declared.
fn answer_output_schema(query: &str, answer_enum: Option<&[String]>) -> Value {
    let answer_field = match answer_enum {
        Some(values) => json!({
            "type": "string",
            "enum": values,
            "description": format!("Answer to: {query}"),
        }),
        None => json!({
            "type": "string",
            "description": format!("Answer to: {query}"),
        }),
    };

    json!({
        "type": "object",
        "required": ["answer", "reasoning", "confidence"],
        "additionalProperties": false,
        "properties": {
            "answer": answer_field,
            "reasoning": {
                "type": "string",
                "description": "Scientific reasoning and evidence for the answer",
            },
            "confidence": {
                "type": "string",
                "enum": ["low", "medium", "high"],
                "description": "Confidence level in the answer based on available evidence",
            },
        },
    })
}

/// Substitute the organism name into the feature's query template, falling
/// back to the bare name when no template is declared.
fn build_query(organism_scientific_name: &str, feature: &FeatureMetadata) -> String {
    match feature.query.as_deref() {
        Some(template) => template.replace("{organism}", organism_scientific_name),
        None => organism_scientific_name.to_string(),
    }
}

/// Source adapter for the Exa answer API.
pub struct ExaAnswerSource {
    client: Client,
    api_key: String,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
}

impl ExaAnswerSource {
    /// Construct from an explicit API key.
    pub fn new(client: &Client, api_key: String, max_attempts: u32) -> SourceResult<Self> {
        Ok(Self {
            client: client.clone(),
            api_key,
            rate_limiter: RateLimiter::new(CALLS_PER_SECOND)
                .map_err(|e| SourceError::Configuration(e.to_string()))?,
            retry: RetryPolicy::new(max_attempts, MIN_BACKOFF, MAX_BACKOFF),
        })
    }

    /// Construct reading `EXA_API_KEY` from the environment.
    pub fn from_env(client: &Client, max_attempts: u32) -> SourceResult<Self> {
        let api_key = std::env::var("EXA_API_KEY")
            .map_err(|_| SourceError::Configuration("EXA_API_KEY must be set".to_string()))?;
        Self::new(client, api_key, max_attempts)
    }

    /// Answer one organism query with the feature's output schema enforced.
    pub async fn answer_organism_query(
        &self,
        organism_scientific_name: &str,
        feature: &FeatureMetadata,
    ) -> SourceResult<ExaAnswer> {
        let query = build_query(organism_scientific_name, feature);
        let output_schema =
            answer_output_schema(&query, feature.answer_enum.as_deref());
        let payload = json!({
            "query": query,
            "output_schema": output_schema,
        });

        self.retry
            .run(
                || async {
                    self.rate_limiter.wait().await;
                    let response = self
                        .client
                        .post(ANSWER_ENDPOINT)
                        .header("x-api-key", &self.api_key)
                        .json(&payload)
                        .send()
                        .await
                        .map_err(transport_error)?;
                    let response = error_for_status(response).await?;
                    response
                        .json()
                        .await
                        .map_err(|e| SourceError::Parse(format!("answer response: {e}")))
                },
                SourceError::is_transient,
            )
            .await
    }
}

#[async_trait]
impl FeatureSource for ExaAnswerSource {
    async fn fetch(
        &self,
        _organism_id: i64,
        organism_scientific_name: &str,
        feature: &FeatureMetadata,
    ) -> SourceResult<Option<Value>> {
        let answer = self
            .answer_organism_query(organism_scientific_name, feature)
            .await?;
        let value =
            serde_json::to_value(answer).map_err(|e| SourceError::Parse(e.to_string()))?;
        Ok(Some(value))
    }
}
