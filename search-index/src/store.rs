//! The vector index abstraction.

use async_trait::async_trait;

use crate::document::{RecentMappings, ScoredMapping, TicketMapping};
use crate::error::{IndexError, Result};

/// Storage for ticket mappings with vector similarity search.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Name of the collection this handle targets.
    fn name(&self) -> &str;

    /// Vector length every stored document must have.
    fn dimension(&self) -> usize;

    /// Create the collection if it does not exist.
    ///
    /// Idempotent. After the first success on a handle, later calls return
    /// immediately without contacting the backend.
    async fn ensure_schema(&self) -> Result<()>;

    /// Nearest neighbours of `vector`, best first, at most `k` of them.
    ///
    /// Scores are whatever the backend reports. [`crate::MemoryIndex`] returns
    /// the raw cosine similarity. Azure AI Search returns its cosine
    /// `@search.score`, which is `1 / (2 - cos)` and lies in `(1/3, 1]`, so a
    /// fixed threshold admits lower cosines there than it does locally.
    async fn search_similar(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredMapping>>;

    /// Insert the mapping, replacing any document with the same id.
    async fn upsert(&self, mapping: TicketMapping) -> Result<()>;

    /// The `n` most recently created mappings, newest first.
    async fn list_recent(&self, n: usize) -> Result<RecentMappings>;

    /// Fetch a mapping by id.
    async fn get(&self, id: &str) -> Result<Option<TicketMapping>>;
}

/// Reject vectors whose length differs from the index definition.
pub fn check_dimension(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(IndexError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}
