//! Error types for the vector index store.

use thiserror::Error;

/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur while talking to a vector index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Vector length does not match the index definition.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The search service answered with a non-success status.
    #[error("search service returned {status}: {body}")]
    Request { status: u16, body: String },

    /// The service accepted the batch but refused a document.
    #[error("document {key} was rejected: {message}")]
    DocumentRejected { key: String, message: String },

    /// Response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Similarity computation failed.
    #[error("similarity error: {0}")]
    Similarity(#[from] sdd_embeddings::EmbeddingError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
