/// Domain-specific error types for pagesearch
///
/// Component errors (embedding, index provider, signer) live beside their
/// traits. `SearchError` is what the orchestrator surfaces to callers; only
/// request-level failures ever reach it.

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Candidate providers unavailable: {0}")]
    ProviderUnavailable(String),
}

impl From<crate::provider::ProviderError> for SearchError {
    fn from(e: crate::provider::ProviderError) -> Self {
        SearchError::ProviderUnavailable(e.to_string())
    }
}

impl SearchError {
    /// Helper to create validation errors with field names
    ///
    /// Example:
    /// ```
    /// use pagesearch::errors::SearchError;
    /// let err = SearchError::validation("query", "Query cannot be empty");
    /// ```
    pub fn validation(field: &str, message: &str) -> Self {
        SearchError::Validation {
            message: message.to_string(),
            field: Some(field.to_string()),
        }
    }
}
