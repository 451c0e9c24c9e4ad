/// Together AI embedding provider
///
/// Calls the OpenAI-compatible Together embeddings endpoint using reqwest.
/// Uses BAAI/bge-base-en-v1.5 (768 dimensions) by default, the model the
/// page vectors were ingested with.
/// Requires PAGESEARCH_EMBEDDING__API_KEY env var or embedding.api_key in config.

use async_trait::async_trait;

use super::{EmbeddingError, EmbeddingProvider};
use crate::config::EmbeddingConfig;

/// Request body for the embeddings API
#[derive(serde::Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Response from the embeddings API
#[derive(serde::Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

/// Single embedding result
#[derive(serde::Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

/// Together-backed embedding provider.
///
/// Requires a valid API key; validated on construction, not at embed time.
pub struct TogetherEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl TogetherEmbeddingProvider {
    /// Create a new TogetherEmbeddingProvider.
    ///
    /// # Errors
    /// Returns `EmbeddingError::NotConfigured` if the API key is missing or empty.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                EmbeddingError::NotConfigured(
                    "Together API key is required for query embeddings. \
                     Set PAGESEARCH_EMBEDDING__API_KEY or embedding.api_key in pagesearch.toml"
                        .to_string(),
                )
            })?;

        Ok(TogetherEmbeddingProvider {
            client: reqwest::Client::new(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for TogetherEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbedRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError::Generation(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(EmbeddingError::Api {
                status,
                message: body,
            });
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Generation(format!("Failed to parse API response: {}", e)))?;

        embed_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::Generation("API returned empty embedding list".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
