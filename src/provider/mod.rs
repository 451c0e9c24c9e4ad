/// Candidate provider abstraction
///
/// A provider answers one query shape at a time with an ordered list of
/// candidates (best first for ranked queries). The Turbopuffer namespace
/// serves all three shapes; tests inject in-process fakes.

pub mod turbopuffer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::CandidateResult;

/// Errors returned by candidate providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (connection refused, DNS, reset)
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Backend returned a non-success status
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Provider not configured (e.g., missing API key)
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Provider call timed out after {0} ms")]
    Timeout(u64),
}

/// The three query shapes the orchestrator issues.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateQuery {
    /// Approximate nearest neighbours of a query embedding
    Vector { embedding: Vec<f32> },
    /// BM25 over the OCR text field
    Lexical { text: String },
    /// Unranked attribute equality filter
    Filter { attribute: String, equals: String },
}

impl CandidateQuery {
    pub fn kind(&self) -> &'static str {
        match self {
            CandidateQuery::Vector { .. } => "vector",
            CandidateQuery::Lexical { .. } => "lexical",
            CandidateQuery::Filter { .. } => "filter",
        }
    }
}

/// Outcome of a cache warm hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Core trait for anything that can answer candidate queries.
///
/// Implementations are shared across concurrent requests and must not keep
/// per-request state.
#[async_trait]
pub trait CandidateProvider: Send + Sync {
    /// Return at most `top_k` candidates for `query`.
    async fn query(
        &self,
        query: &CandidateQuery,
        top_k: usize,
    ) -> Result<Vec<CandidateResult>, ProviderError>;

    /// Ask the backend to pre-load its index. Providers without a cache may
    /// report success without doing anything.
    async fn warm_cache(&self) -> Result<WarmStatus, ProviderError> {
        Ok(WarmStatus {
            status: "ACCEPTED".to_string(),
            message: None,
        })
    }
}
