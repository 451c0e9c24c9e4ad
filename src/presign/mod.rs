/// Object URL signing
///
/// Turns an opaque object reference into a time-limited URL that a browser
/// can fetch directly. The R2 implementation signs locally with SigV4.

pub mod r2;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignerError {
    /// Signer not configured (e.g., missing credentials)
    #[error("Signer not configured: {0}")]
    NotConfigured(String),

    /// Reference cannot be turned into a request path
    #[error("Invalid object reference: {0}")]
    InvalidReference(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Signing timed out after {0} ms")]
    Timeout(u64),
}

/// Produces time-limited access URLs for stored objects.
///
/// Shared across requests; implementations must be stateless per call.
#[async_trait]
pub trait ObjectUrlSigner: Send + Sync {
    async fn sign(&self, object_ref: &str) -> Result<String, SignerError>;
}
