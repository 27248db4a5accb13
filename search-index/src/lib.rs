//! # Search Index
//!
//! Vector index store for spec-to-dev ticket mappings.
//!
//! Every backend implements [`VectorIndex`]:
//!
//! - [`AzureSearchIndex`]: Azure AI Search over REST, HNSW by default with an
//!   exhaustive KNN profile for exact queries
//! - [`MemoryIndex`]: exact cosine search in process, optionally mirrored to a
//!   JSON file
//!
//! ```rust,ignore
//! use sdd_search_index::{AzureSearchIndex, IndexSchema, VectorIndex};
//!
//! let index = AzureSearchIndex::new(endpoint, key, IndexSchema::ticket_mappings("tickets", 1536));
//! index.ensure_schema().await?;
//! let hits = index.search_similar(&vector, 5).await?;
//! ```

pub mod azure;
pub mod document;
pub mod error;
pub mod memory;
pub mod schema;
pub mod store;

pub use azure::{AzureSearchIndex, SearchMode};
pub use document::{RecentMappings, ScoredMapping, TicketMapping};
pub use error::{IndexError, Result};
pub use memory::MemoryIndex;
pub use schema::{DEFAULT_INDEX_NAME, IndexSchema};
pub use store::VectorIndex;
