/// Turbopuffer namespace provider
///
/// Calls the Turbopuffer query API using reqwest. One namespace serves the
/// vector (ANN), lexical (BM25 over `ocr_result`) and filter queries.
/// Requires PAGESEARCH_INDEX__API_KEY env var or index.api_key in config.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::{CandidateProvider, CandidateQuery, ProviderError, WarmStatus};
use crate::config::IndexConfig;
use crate::search::{CandidateResult, PageAttributes};

/// Attributes requested on every query
const PAGE_ATTRIBUTES: [&str; 4] = ["parent_issue_id", "page_number", "ocr_result", "r2_object_id"];

/// Full-text field ranked by BM25
const TEXT_FIELD: &str = "ocr_result";

/// Request body for the namespace query endpoint
#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    rank_by: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<Value>,
    top_k: usize,
    include_attributes: &'a [&'a str],
}

/// Response from the namespace query endpoint
#[derive(serde::Deserialize)]
struct QueryResponse {
    #[serde(default)]
    rows: Option<Vec<Map<String, Value>>>,
}

pub struct TurbopufferProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    namespace: String,
}

impl TurbopufferProvider {
    /// Create a provider for the configured namespace.
    ///
    /// # Errors
    /// Returns `ProviderError::NotConfigured` if the API key is missing or empty.
    pub fn new(config: &IndexConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::NotConfigured(
                    "Turbopuffer API key is required. \
                     Set PAGESEARCH_INDEX__API_KEY or index.api_key in pagesearch.toml"
                        .to_string(),
                )
            })?;

        Ok(TurbopufferProvider {
            client: reqwest::Client::new(),
            api_key,
            endpoint: config.endpoint(),
            namespace: config.namespace.clone(),
        })
    }

    fn build_request(query: &CandidateQuery, top_k: usize) -> QueryRequest<'static> {
        let (rank_by, filters) = match query {
            CandidateQuery::Vector { embedding } => (Some(json!(["vector", "ANN", embedding])), None),
            CandidateQuery::Lexical { text } => (Some(json!([TEXT_FIELD, "BM25", text])), None),
            CandidateQuery::Filter { attribute, equals } => {
                (None, Some(json!([attribute, "Eq", equals])))
            }
        };
        QueryRequest {
            rank_by,
            filters,
            top_k,
            include_attributes: &PAGE_ATTRIBUTES,
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        Err(ProviderError::Api { status, message })
    }
}

/// Convert one response row into a candidate. Rows without an id are dropped.
fn row_to_candidate(row: Map<String, Value>) -> Option<CandidateResult> {
    let id = match row.get("id")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let score = row.get("$dist").and_then(Value::as_f64).unwrap_or(0.0);
    let attributes: PageAttributes = serde_json::from_value(Value::Object(row)).unwrap_or_default();
    Some(CandidateResult::new(id, score, attributes))
}

#[async_trait]
impl CandidateProvider for TurbopufferProvider {
    async fn query(
        &self,
        query: &CandidateQuery,
        top_k: usize,
    ) -> Result<Vec<CandidateResult>, ProviderError> {
        let url = format!("{}/v2/namespaces/{}/query", self.endpoint, self.namespace);
        let request = Self::build_request(query, top_k);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let body: QueryResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        let rows = body.rows.unwrap_or_default();
        let total = rows.len();
        let candidates: Vec<CandidateResult> = rows.into_iter().filter_map(row_to_candidate).collect();
        if candidates.len() < total {
            tracing::warn!(
                kind = query.kind(),
                dropped = total - candidates.len(),
                "Dropped index rows without a usable id"
            );
        }
        Ok(candidates)
    }

    async fn warm_cache(&self) -> Result<WarmStatus, ProviderError> {
        let url = format!("{}/v1/namespaces/{}/hint_cache_warm", self.endpoint, self.namespace);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}
