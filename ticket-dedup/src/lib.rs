//! # Ticket Deduplication
//!
//! Decides whether a new spec ticket already has a dev ticket and GitHub
//! issue, and records the mapping once one is created.
//!
//! ## Architecture
//!
//! ```text
//!   spec ticket text
//!          │
//!          ▼
//!  ┌────────────────┐     ┌────────────────┐
//!  │ EmbeddingClient│────▶│  VectorIndex   │  Azure AI Search or
//!  │  (retry, dims) │     │ (ensure_schema,│  local JSON file
//!  └────────────────┘     │  search/upsert)│
//!                         └───────┬────────┘
//!                                 ▼
//!                     ┌──────────────────────┐
//!                     │     TicketDedup      │
//!                     │ threshold 0.85, k=5  │
//!                     └──────────┬───────────┘
//!                                ▼
//!              DuplicateCheck / TicketMapping / RecentMappings
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sdd_ticket_dedup::{DedupConfig, TicketDedup};
//!
//! let config = DedupConfig::from_env();
//! let dedup = TicketDedup::new(config.embedding_client()?, config.azure_index()?)?;
//!
//! let check = dedup.find_or_flag_duplicate("Users can reset their password").await?;
//! println!("{check}");
//! ```

pub mod config;
pub mod error;
pub mod mapping;
pub mod report;
pub mod workflow;

pub use config::{DedupConfig, EmbeddingProviderType, IndexBackend};
pub use error::{DedupError, IndexOperation, Result};
pub use mapping::mapping_id;
pub use report::{HistoryReport, SavedMapping};
pub use workflow::{
    DEFAULT_HISTORY_LEN, DEFAULT_NEIGHBORS, DuplicateCheck, SIMILARITY_THRESHOLD, TicketDedup,
    select_matches,
};

// Re-export from dependencies for convenience
pub use sdd_embeddings::{EmbeddingClient, OpenAIProvider};
pub use sdd_search_index::{RecentMappings, ScoredMapping, TicketMapping};
