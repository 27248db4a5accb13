//! # Embeddings
//!
//! Turns ticket text into dense vectors for similarity search.
//!
//! ## Features
//!
//! - **Providers**: OpenAI and Azure OpenAI embedding endpoints
//! - **Normalization**: Input cleanup so degenerate text never reaches the model
//! - **Retry**: Linear backoff on transient provider failures
//! - **Similarity**: Cosine scoring and top-k ranking for local indexes
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Embedding Client                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  text ──► normalize_input ──► EmbeddingProvider ──► Embedding   │
//! │                                    ▲      │                     │
//! │                                    └──────┘                     │
//! │                              RetryPolicy (attempt * step)       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod error;
pub mod preprocess;
pub mod provider;
pub mod similarity;

pub use client::{EmbeddingClient, RetryPolicy};
pub use error::{EmbeddingError, Result};
pub use preprocess::{EMPTY_INPUT_PLACEHOLDER, normalize_input};
pub use provider::{
    ApiFlavor, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, OpenAIProvider,
};
pub use similarity::{SimilarityResult, cosine_similarity, find_top_k};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension of embeddings produced by the reference model family.
pub const DEFAULT_DIMENSION: usize = 1536; // text-embedding-3-small / ada-002
