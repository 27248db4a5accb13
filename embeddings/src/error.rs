//! Error types for the embeddings system.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur in the embeddings system.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Provider not configured.
    #[error("embedding provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// API request failed.
    #[error("API request failed with status {status}: {body}")]
    ApiRequest { status: u16, body: String },

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Input exceeds the configured length limit.
    #[error("text too long: {length} characters exceeds limit of {max_length}")]
    TextTooLong { length: usize, max_length: usize },

    /// Every attempt allowed by the retry policy failed.
    #[error("embedding failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<EmbeddingError>,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EmbeddingError {
    /// Whether another attempt could succeed without changing the request.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ApiRequest { status, .. } => *status >= 500 || *status == 408,
            Self::RateLimited { .. } | Self::InvalidResponse(_) | Self::Http(_) => true,
            Self::ProviderNotConfigured(_)
            | Self::DimensionMismatch { .. }
            | Self::TextTooLong { .. }
            | Self::RetriesExhausted { .. }
            | Self::Serialization(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(
            EmbeddingError::ApiRequest {
                status: 503,
                body: String::new()
            }
            .is_transient()
        );
        assert!(EmbeddingError::RateLimited { retry_after_secs: 1 }.is_transient());
        assert!(
            !EmbeddingError::ApiRequest {
                status: 401,
                body: "bad key".to_string()
            }
            .is_transient()
        );
        assert!(
            !EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
            .is_transient()
        );
    }
}
