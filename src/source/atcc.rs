//! ATCC source
//!
//! ATCC has no public API; search results and product pages are pulled
//! through the web-extraction service. A fetch runs one search-page
//! extraction, then extracts product details for the first `max_products`
//! hits.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use super::{percent_encode, ExtractClient, FeatureSource, SourceError, SourceResult};
use crate::catalog::FeatureMetadata;
use crate::pipeline::RetryPolicy;

/// Extractions fail in messier ways than JSON APIs; fewer attempts with a
/// longer floor keeps a bad page from stalling the batch.
const EXTRACT_MAX_ATTEMPTS: u32 = 4;
const EXTRACT_MIN_BACKOFF: Duration = Duration::from_secs(5);
const EXTRACT_MAX_BACKOFF: Duration = Duration::from_secs(60);

const RESULTS_PER_PAGE: u32 = 12;

const SEARCH_EXTRACT_PROMPT: &str = "\
Extract all product cards visible on the ATCC search results page.

If you see \"No results for <query organism name>\" or similar no-results \
message, return total_results as 0 and products as an empty array.";

const PRODUCT_EXTRACT_PROMPT: &str =
    "Extract detailed information from the ATCC product detail page.";

/// Product card from ATCC search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtccProduct {
    /// Product detail page URL, e.g. <https://www.atcc.org/products/9765>.
    pub url: Option<String>,
}

/// Search results from ATCC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtccSearchResults {
    /// The search URL that was used.
    pub url: Option<String>,
    /// Product cards on the page.
    #[serde(default)]
    pub products: Vec<AtccProduct>,
    /// Total results reported at the top of the page, or the number of
    /// products on the page when no total is shown.
    pub total_results: Option<u64>,
}

/// Detailed product information from an ATCC product page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtccProductDetail {
    /// Product name, e.g. "Chlorella vulgaris Beijerinck".
    pub name: Option<String>,
    /// ATCC identifier, e.g. "9765".
    pub atcc_id: Option<String>,
    /// Bioz score text, e.g. "94/100".
    pub bioz_stars: Option<String>,
    /// Number of citations.
    pub product_citations: Option<i64>,
    /// Product category, e.g. "Protists".
    pub product_category: Option<String>,
    /// Product type, e.g. "Algae".
    pub product_type: Option<String>,
    /// Classification, e.g. "KINGDOM: Plantae".
    pub classification: Option<String>,
    /// Strain designation, e.g. "L-756a".
    pub strain_designation: Option<String>,
    /// Type strain flag text, "Yes" or "No".
    pub type_strain: Option<String>,
    /// Listed applications.
    pub applications: Option<Vec<String>>,
    /// Product format, e.g. "Frozen".
    pub product_format: Option<String>,
    /// Storage conditions and requirements.
    pub storage_conditions: Option<String>,
    /// Biosafety level text, e.g. "BSL 1".
    pub bsl_level: Option<String>,
    /// Price text, null when no price is shown.
    pub price: Option<String>,
    /// Stock flag derived from availability wording on the page.
    pub in_stock: Option<bool>,
    /// Whether the product is a Mission Collection item.
    pub mission_collection_item: Option<bool>,
}

/// Combined search results and product details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtccSearchAndProductResults {
    /// Search results from the ATCC search page.
    pub search_results: Option<AtccSearchResults>,
    /// Detailed information for the first few products.
    #[serde(default)]
    pub product_details: Vec<AtccProductDetail>,
}

/// JSON schema handed to the extractor for search result pages. The field
/// descriptions steer the extraction and are part of the contract.
fn search_results_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "url": {
                "type": ["string", "null"],
                "description": "The search URL that was used"
            },
            "products": {
                "type": "array",
                "description": "List of products",
                "items": {
                    "type": "object",
                    "properties": {
                        "url": {
                            "type": ["string", "null"],
                            "description": "The product detail page URL e.g. https://www.atcc.org/products/9765"
                        }
                    }
                }
            },
            "total_results": {
                "type": ["integer", "null"],
                "description": "The total number of results displayed at the top of the page e.g. from text like 'Results 145-192 of 25,559 for Saccharomyces cerevisiae'. IMPORTANT: When extracting numbers, handle thousands separators (commas) correctly. For example, '25,559' should be extracted as 25559 (not 25). If not present, count the number of products on the page and return that as the total_results."
            }
        }
    })
}

/// JSON schema handed to the extractor for product detail pages.
fn product_detail_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": ["string", "null"], "description": "The product name e.g., 'Chlorella vulgaris Beijerinck'"},
            "atcc_id": {"type": ["string", "null"], "description": "The ATCC identifier e.g., '9765'"},
            "bioz_stars": {"type": ["string", "null"], "description": "The Bioz score text e.g., '94/100'"},
            "product_citations": {"type": ["integer", "null"], "description": "Number of citations e.g., '31'"},
            "product_category": {"type": ["string", "null"], "description": "Product category, e.g., 'Protists'"},
            "product_type": {"type": ["string", "null"], "description": "Product type, e.g., 'Algae'"},
            "classification": {"type": ["string", "null"], "description": "Classification, e.g., 'KINGDOM: Plantae'"},
            "strain_designation": {"type": ["string", "null"], "description": "Strain designation, e.g., 'L-756a'"},
            "type_strain": {"type": ["string", "null"], "description": "Type strain, e.g., 'Yes' or 'No'"},
            "applications": {
                "type": ["array", "null"],
                "items": {"type": "string"},
                "description": "Applications, e.g., ['Biofuel production', 'Food production research']"
            },
            "product_format": {"type": ["string", "null"], "description": "Product format, e.g., 'Frozen'"},
            "storage_conditions": {"type": ["string", "null"], "description": "Storage conditions and requirements"},
            "bsl_level": {"type": ["string", "null"], "description": "The biosafety level text e.g. 'BSL 1'"},
            "price": {
                "type": ["string", "null"],
                "description": "Price text for the product. If a price cannot be found, set it to null. Do not guess or default to '0'."
            },
            "in_stock": {
                "type": ["boolean", "null"],
                "description": "Boolean stock flag based on availability. Rules: 1) If mission_collection_item is true, then in_stock must be false. 2) An item that is out of stock may still show 'Buy Now' or 'Add to Cart' text/button. It will have buttons that show 'Notify Me When Available' or show 'This item is currently not in stock. We cannot estimate a shipment date for this item.'. 3) For an item that is in_stock, it would show 'Generally ships within X business days'. 4) An item that shows 'limited inventory' is in stock. Otherwise, set in_stock to true."
            },
            "mission_collection_item": {
                "type": ["boolean", "null"],
                "description": "Boolean flag indicating Mission Collection items: Set to true if the product card contains the phrase 'This is a Mission Collection Item' OR if there is a Mission Collection CTA link or a button saying 'Check Purchase Information'. Otherwise, set to false."
            }
        }
    })
}

/// Source adapter for the ATCC catalog.
pub struct AtccSource {
    extract: ExtractClient,
    retry: RetryPolicy,
}

impl AtccSource {
    /// Construct over an existing extraction client.
    pub fn new(extract: ExtractClient) -> Self {
        Self {
            extract,
            retry: RetryPolicy::new(EXTRACT_MAX_ATTEMPTS, EXTRACT_MIN_BACKOFF, EXTRACT_MAX_BACKOFF),
        }
    }

    /// Construct reading the extraction service key from the environment.
    pub fn from_env(client: &Client) -> SourceResult<Self> {
        Ok(Self::new(ExtractClient::from_env(client)?))
    }

    /// Build the ATCC search page URL, filtered to products.
    ///
    /// Pagination lives in the URL hash; only the first page is fetched.
    fn search_page_url(query: &str) -> String {
        let encoded = percent_encode(query);
        format!(
            "https://www.atcc.org/search#q={encoded}&sort=relevancy&numberOfResults={RESULTS_PER_PAGE}&f:Contenttype=%5BProducts%5D"
        )
    }

    /// Extract ATCC search results for a query.
    ///
    /// Schema/parse failures count as extraction failures and are retried;
    /// they are never coerced to "0 results".
    pub async fn search_products(&self, query: &str) -> SourceResult<AtccSearchResults> {
        let url = Self::search_page_url(query);
        let schema = search_results_schema();

        self.retry
            .run(
                || async {
                    let mut data = self
                        .extract
                        .extract(&url, SEARCH_EXTRACT_PROMPT, Some(&schema))
                        .await?;
                    if !data.is_object() {
                        return Err(SourceError::InvalidResponse(format!(
                            "search extraction returned non-object for url={url}"
                        )));
                    }
                    data["url"] = json!(url);
                    serde_json::from_value(data).map_err(|e| {
                        SourceError::Parse(format!(
                            "search extraction validation failed for url={url}: {e}"
                        ))
                    })
                },
                // Extraction output is unreliable enough that every failure
                // kind gets another attempt.
                |_| true,
            )
            .await
    }

    /// Extract detailed information from one product detail page.
    pub async fn product_detail(&self, url: &str) -> SourceResult<AtccProductDetail> {
        let schema = product_detail_schema();

        self.retry
            .run(
                || async {
                    let data = self
                        .extract
                        .extract(url, PRODUCT_EXTRACT_PROMPT, Some(&schema))
                        .await?;
                    serde_json::from_value(data).map_err(|e| {
                        SourceError::Parse(format!(
                            "product extraction validation failed for url={url}: {e}"
                        ))
                    })
                },
                |_| true,
            )
            .await
    }

    /// Search for organism products and extract details for the first
    /// `max_products` hits.
    pub async fn search_and_get_products(
        &self,
        organism_scientific_name: &str,
        max_products: u32,
    ) -> SourceResult<AtccSearchAndProductResults> {
        let search_results = self.search_products(organism_scientific_name).await?;

        let mut product_details = Vec::new();
        if max_products > 0 {
            for product in search_results.products.iter().take(max_products as usize) {
                if let Some(url) = product.url.as_deref() {
                    product_details.push(self.product_detail(url).await?);
                }
            }
        }

        Ok(AtccSearchAndProductResults {
            search_results: Some(search_results),
            product_details,
        })
    }
}

#[async_trait]
impl FeatureSource for AtccSource {
    async fn fetch(
        &self,
        _organism_id: i64,
        organism_scientific_name: &str,
        feature: &FeatureMetadata,
    ) -> SourceResult<Option<Value>> {
        let results = self
            .search_and_get_products(
                organism_scientific_name,
                feature.max_products.unwrap_or(0),
            )
            .await?;
        let value =
            serde_json::to_value(results).map_err(|e| SourceError::Parse(e.to_string()))?;
        Ok(Some(value))
    }
}
