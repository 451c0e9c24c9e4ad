/// Presigned URL enrichment for search results and page listings
///
/// Every item with an object reference gets its own signing call; all calls
/// for one batch run concurrently and are joined before returning. Output
/// order is input order. A failed or timed-out signing call leaves that
/// item's URL as `None` and is only logged.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use super::{CandidateResult, EnrichedResult, FusedResult, PageEntry};
use crate::presign::{ObjectUrlSigner, SignerError};

/// Result of resolving one item's object reference.
#[derive(Debug)]
pub enum SignOutcome {
    /// Item carries no object reference; no call was made
    NoReference,
    Signed(String),
    Failed { object_ref: String, error: SignerError },
}

impl SignOutcome {
    fn into_url(self) -> Option<String> {
        match self {
            SignOutcome::Signed(url) => Some(url),
            SignOutcome::NoReference => None,
            SignOutcome::Failed { object_ref, error } => {
                tracing::warn!(object_ref = %object_ref, error = %error, "Failed to presign image URL");
                None
            }
        }
    }
}

#[derive(Clone)]
pub struct ResultEnricher {
    signer: Arc<dyn ObjectUrlSigner + Send + Sync>,
    sign_timeout: Duration,
}

impl ResultEnricher {
    pub fn new(signer: Arc<dyn ObjectUrlSigner + Send + Sync>, sign_timeout: Duration) -> Self {
        Self {
            signer,
            sign_timeout,
        }
    }

    async fn sign_one(&self, object_ref: Option<&str>) -> SignOutcome {
        let Some(object_ref) = object_ref else {
            return SignOutcome::NoReference;
        };

        let result = match tokio::time::timeout(self.sign_timeout, self.signer.sign(object_ref)).await {
            Ok(result) => result,
            Err(_) => Err(SignerError::Timeout(self.sign_timeout.as_millis() as u64)),
        };

        match result {
            Ok(url) => SignOutcome::Signed(url),
            Err(error) => SignOutcome::Failed {
                object_ref: object_ref.to_string(),
                error,
            },
        }
    }

    /// Resolve every reference concurrently; the i-th outcome belongs to the i-th reference.
    pub async fn resolve_all(&self, object_refs: &[Option<&str>]) -> Vec<SignOutcome> {
        join_all(object_refs.iter().map(|object_ref| self.sign_one(*object_ref))).await
    }

    /// Attach image URLs to fused results, preserving order.
    pub async fn enrich(&self, results: Vec<FusedResult>) -> Vec<EnrichedResult> {
        let outcomes = {
            let refs: Vec<Option<&str>> = results.iter().map(|r| r.attributes.object_ref()).collect();
            self.resolve_all(&refs).await
        };

        let enriched: Vec<EnrichedResult> = results
            .into_iter()
            .zip(outcomes)
            .map(|(result, outcome)| EnrichedResult {
                id: result.id,
                attributes: result.attributes,
                image_url: outcome.into_url(),
                score: result.fused_score,
            })
            .collect();

        let without_url = enriched.iter().filter(|r| r.image_url.is_none()).count();
        tracing::debug!(total = enriched.len(), without_url, "Enrichment complete");
        enriched
    }

    /// Attach image URLs to page rows from the listing query, preserving order.
    pub async fn enrich_pages(&self, rows: Vec<CandidateResult>) -> Vec<PageEntry> {
        let outcomes = {
            let refs: Vec<Option<&str>> = rows.iter().map(|r| r.attributes.object_ref()).collect();
            self.resolve_all(&refs).await
        };

        rows.into_iter()
            .zip(outcomes)
            .map(|(row, outcome)| PageEntry {
                page_number: row.attributes.page_number,
                image_url: outcome.into_url(),
                ocr_result: row.attributes.ocr_result,
            })
            .collect()
    }
}
