//! Error types for the deduplication workflow.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for workflow operations.
pub type Result<T> = std::result::Result<T, DedupError>;

/// The index call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOperation {
    Open,
    EnsureSchema,
    Search,
    Upsert,
    History,
}

impl fmt::Display for IndexOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Self::Open => "open the local ticket store",
            Self::EnsureSchema => "check or create the ticket index",
            Self::Search => "search similar tickets",
            Self::Upsert => "save ticket mapping",
            Self::History => "read ticket history",
        };
        f.write_str(action)
    }
}

/// Errors that can occur in the deduplication workflow.
#[derive(Error, Debug)]
pub enum DedupError {
    /// Embedding generation failed (after the client's retries).
    #[error("embedding failed: {0}")]
    Embedding(#[from] sdd_embeddings::EmbeddingError),

    /// The vector index rejected or failed a request.
    #[error("failed to {operation}: {source}")]
    Index {
        operation: IndexOperation,
        #[source]
        source: sdd_search_index::IndexError,
    },

    /// Invalid caller input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl DedupError {
    /// Wrap an index error with the operation that produced it.
    pub fn index(operation: IndexOperation) -> impl FnOnce(sdd_search_index::IndexError) -> Self {
        move |source| Self::Index { operation, source }
    }
}
