/// Search orchestration
///
/// Sequencing for one search:
///   1. Embed the query text (failure degrades to lexical-only)
///   2. Query the vector and lexical legs concurrently, each under its own timeout
///   3. Fuse the full candidate union with RRF, then truncate to match_count
///   4. Presign image URLs for the surviving rows concurrently
///
/// A leg that errors or times out contributes an empty list. Only when every
/// attempted leg fails is the search reported as an error.

use std::sync::Arc;
use std::time::Duration;

use super::{CandidateResult, EnrichedResult, PageEntry, RankFusion, ResultEnricher};
use crate::config::SearchConfig;
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::errors::SearchError;
use crate::provider::{CandidateProvider, CandidateQuery, ProviderError, WarmStatus};

/// Attribute the page listing filters on.
const PARENT_ATTRIBUTE: &str = "parent_issue_id";

pub struct SearchService {
    embedder: Arc<dyn EmbeddingProvider + Send + Sync>,
    index: Arc<dyn CandidateProvider + Send + Sync>,
    enricher: ResultEnricher,
    fusion: RankFusion,
    config: SearchConfig,
    embed_timeout: Duration,
    provider_timeout: Duration,
}

/// Outcome of one candidate leg.
enum Leg {
    Ok(Vec<CandidateResult>),
    /// Not attempted (no embedding available)
    Skipped,
    Failed(ProviderError),
}

impl Leg {
    fn failed(&self) -> bool {
        matches!(self, Leg::Failed(_))
    }

    fn into_candidates(self, kind: &str) -> Vec<CandidateResult> {
        match self {
            Leg::Ok(candidates) => candidates,
            Leg::Skipped => Vec::new(),
            Leg::Failed(error) => {
                tracing::warn!(leg = kind, error = %error, "Candidate leg failed, fusing without it");
                Vec::new()
            }
        }
    }
}

impl SearchService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider + Send + Sync>,
        index: Arc<dyn CandidateProvider + Send + Sync>,
        enricher: ResultEnricher,
        config: SearchConfig,
        embed_timeout: Duration,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            index,
            enricher,
            fusion: RankFusion::new(config.rrf_k),
            config,
            embed_timeout,
            provider_timeout,
        }
    }

    /// Resolve an optional caller-supplied match count against the configured bounds.
    pub fn match_count(&self, requested: Option<usize>) -> Result<usize, SearchError> {
        let count = requested.unwrap_or(self.config.default_match_count);
        if count == 0 || count > self.config.max_match_count {
            return Err(SearchError::validation(
                "match_count",
                &format!("match_count must be between 1 and {}", self.config.max_match_count),
            ));
        }
        Ok(count)
    }

    /// Candidates to request from each leg; never fewer than match_count.
    fn candidate_depth(&self, match_count: usize) -> usize {
        match_count.saturating_mul(self.config.overfetch_factor.max(1))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        match tokio::time::timeout(self.embed_timeout, self.embedder.embed(text)).await {
            Ok(result) => result,
            Err(_) => Err(EmbeddingError::Timeout(self.embed_timeout.as_millis() as u64)),
        }
    }

    async fn run_leg(&self, query: Option<CandidateQuery>, top_k: usize) -> Leg {
        let Some(query) = query else {
            return Leg::Skipped;
        };
        match tokio::time::timeout(self.provider_timeout, self.index.query(&query, top_k)).await {
            Ok(Ok(candidates)) => {
                tracing::debug!(leg = query.kind(), count = candidates.len(), "Candidate leg returned");
                Leg::Ok(candidates)
            }
            Ok(Err(error)) => Leg::Failed(error),
            Err(_) => Leg::Failed(ProviderError::Timeout(self.provider_timeout.as_millis() as u64)),
        }
    }

    /// Embed `query_text`, then run the hybrid search.
    ///
    /// An embedding failure is logged and the search continues lexical-only.
    pub async fn search_text(
        &self,
        query_text: &str,
        match_count: usize,
    ) -> Result<Vec<EnrichedResult>, SearchError> {
        if query_text.trim().is_empty() {
            return Err(SearchError::validation("query", "Query cannot be empty"));
        }

        let embedding = match self.embed(query_text).await {
            Ok(embedding) => Some(embedding),
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    model = self.embedder.model_name(),
                    "Query embedding failed, falling back to lexical-only search"
                );
                None
            }
        };

        self.search(query_text, embedding, match_count).await
    }

    /// Hybrid search with a precomputed embedding.
    ///
    /// `None` for the embedding skips the vector leg.
    #[tracing::instrument(skip(self, query_embedding), fields(request_id = %uuid::Uuid::new_v4()))]
    pub async fn search(
        &self,
        query_text: &str,
        query_embedding: Option<Vec<f32>>,
        match_count: usize,
    ) -> Result<Vec<EnrichedResult>, SearchError> {
        let depth = self.candidate_depth(match_count);
        let vector_query = query_embedding.map(|embedding| CandidateQuery::Vector { embedding });
        let lexical_query = CandidateQuery::Lexical {
            text: query_text.to_string(),
        };

        let (vector, lexical) = tokio::join!(
            self.run_leg(vector_query, depth),
            self.run_leg(Some(lexical_query), depth),
        );

        let vector_down = vector.failed() || matches!(vector, Leg::Skipped);
        if vector_down && lexical.failed() {
            let reason = match (&vector, &lexical) {
                (Leg::Failed(v), Leg::Failed(l)) => format!("vector: {}; lexical: {}", v, l),
                (_, Leg::Failed(l)) => format!("vector: no embedding; lexical: {}", l),
                _ => "all candidate legs failed".to_string(),
            };
            tracing::error!(reason = %reason, "Search failed: no candidate leg available");
            return Err(SearchError::ProviderUnavailable(reason));
        }

        let vector = vector.into_candidates("vector");
        let lexical = lexical.into_candidates("lexical");
        let fused = self.fusion.fuse_top(&vector, &lexical, match_count);
        tracing::info!(
            vector = vector.len(),
            lexical = lexical.len(),
            returned = fused.len(),
            "Fused candidate lists"
        );

        Ok(self.enricher.enrich(fused).await)
    }

    /// Every page of one issue, with image URLs, in index order.
    #[tracing::instrument(skip(self))]
    pub async fn list_pages(&self, issue_id: &str) -> Result<Vec<PageEntry>, SearchError> {
        if issue_id.trim().is_empty() {
            return Err(SearchError::validation("issue_id", "Issue id cannot be empty"));
        }

        let query = CandidateQuery::Filter {
            attribute: PARENT_ATTRIBUTE.to_string(),
            equals: issue_id.to_string(),
        };
        let rows = match self.run_leg(Some(query), self.config.page_listing_cap).await {
            Leg::Ok(rows) => rows,
            Leg::Failed(error) => {
                tracing::error!(error = %error, "Page listing query failed");
                return Err(error.into());
            }
            Leg::Skipped => Vec::new(),
        };

        let pages = self.enricher.enrich_pages(rows).await;
        tracing::info!(count = pages.len(), "Found pages");
        Ok(pages)
    }

    /// Hint the index to load the namespace into cache.
    pub async fn warm(&self) -> Result<WarmStatus, SearchError> {
        match tokio::time::timeout(self.provider_timeout, self.index.warm_cache()).await {
            Ok(Ok(status)) => {
                tracing::info!(status = %status.status, "Cache warm requested");
                Ok(status)
            }
            Ok(Err(error)) => Err(error.into()),
            Err(_) => Err(ProviderError::Timeout(self.provider_timeout.as_millis() as u64).into()),
        }
    }
}
