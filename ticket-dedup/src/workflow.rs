//! The deduplication workflow.

use chrono::Utc;
use tracing::{debug, info};

use sdd_embeddings::{EmbeddingClient, EmbeddingProvider};
use sdd_search_index::{RecentMappings, ScoredMapping, TicketMapping, VectorIndex};

use crate::error::{DedupError, IndexOperation, Result};
use crate::mapping::mapping_id;

/// Minimum score for a neighbour to count as an existing ticket.
pub const SIMILARITY_THRESHOLD: f32 = 0.85;

/// Nearest neighbours fetched per duplicate check.
pub const DEFAULT_NEIGHBORS: usize = 5;

/// Mappings returned by history when no count is given.
pub const DEFAULT_HISTORY_LEN: usize = 5;

/// Outcome of a duplicate check.
#[derive(Debug, Clone, PartialEq)]
pub enum DuplicateCheck {
    /// Nothing in the index reached the threshold.
    NotFound,
    /// Existing tickets at or above the threshold, best first.
    Matches(Vec<ScoredMapping>),
}

impl DuplicateCheck {
    /// Whether any existing ticket matched.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Matches(_))
    }

    /// Matching tickets, best first. Empty for [`DuplicateCheck::NotFound`].
    pub fn matches(&self) -> &[ScoredMapping] {
        match self {
            Self::NotFound => &[],
            Self::Matches(matches) => matches,
        }
    }

    /// The highest scoring match.
    pub fn best(&self) -> Option<&ScoredMapping> {
        self.matches().first()
    }
}

/// Keep hits scoring at least `threshold`, best first.
///
/// Equal scores keep the order the index returned them in.
pub fn select_matches(mut hits: Vec<ScoredMapping>, threshold: f32) -> Vec<ScoredMapping> {
    hits.retain(|hit| hit.score >= threshold);
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits
}

/// Checks new spec tickets against recorded ones and records new mappings.
///
/// Owns one embedding client and one index handle for its lifetime. Every
/// operation goes through [`VectorIndex::ensure_schema`], which only reaches
/// the backend until the first success.
pub struct TicketDedup<P, I> {
    /// Embedding client.
    embedder: EmbeddingClient<P>,

    /// Vector index holding the mappings.
    index: I,

    /// Minimum score for a match.
    threshold: f32,

    /// Neighbours fetched per query.
    neighbors: usize,
}

impl<P, I> TicketDedup<P, I>
where
    P: EmbeddingProvider,
    I: VectorIndex,
{
    /// Create a workflow over an embedding client and an index.
    ///
    /// Fails if the client's vector length differs from the index's.
    pub fn new(embedder: EmbeddingClient<P>, index: I) -> Result<Self> {
        if embedder.dimension() != index.dimension() {
            return Err(DedupError::Config(format!(
                "embedding dimension {} does not match index '{}' dimension {}",
                embedder.dimension(),
                index.name(),
                index.dimension()
            )));
        }
        Ok(Self {
            embedder,
            index,
            threshold: SIMILARITY_THRESHOLD,
            neighbors: DEFAULT_NEIGHBORS,
        })
    }

    /// Set the match threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the number of neighbours fetched per query.
    pub fn with_neighbors(mut self, neighbors: usize) -> Self {
        self.neighbors = neighbors.max(1);
        self
    }

    /// The match threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// The embedding client.
    pub fn embedder(&self) -> &EmbeddingClient<P> {
        &self.embedder
    }

    /// The underlying index.
    pub fn index(&self) -> &I {
        &self.index
    }

    /// Make sure the index exists.
    pub async fn prepare(&self) -> Result<()> {
        self.index
            .ensure_schema()
            .await
            .map_err(DedupError::index(IndexOperation::EnsureSchema))
    }

    /// Look for recorded spec tickets similar to `spec_content`.
    pub async fn find_or_flag_duplicate(&self, spec_content: &str) -> Result<DuplicateCheck> {
        self.prepare().await?;

        let vector = self.embedder.embed(spec_content).await?;
        let hits = self
            .index
            .search_similar(&vector, self.neighbors)
            .await
            .map_err(DedupError::index(IndexOperation::Search))?;
        debug!("Index '{}' returned {} neighbours", self.index.name(), hits.len());

        let matches = select_matches(hits, self.threshold);
        if matches.is_empty() {
            info!("No existing ticket reached similarity {}", self.threshold);
            return Ok(DuplicateCheck::NotFound);
        }

        info!(
            "Found {} existing ticket(s) at or above similarity {}",
            matches.len(),
            self.threshold
        );
        Ok(DuplicateCheck::Matches(matches))
    }

    /// Record which dev ticket and GitHub issue were created for a spec ticket.
    ///
    /// Recording the same spec link again replaces the earlier mapping.
    pub async fn record_mapping(
        &self,
        spec_ticket_link: &str,
        spec_ticket_content: &str,
        dev_ticket_link: &str,
        github_issue_link: &str,
    ) -> Result<TicketMapping> {
        let spec_ticket_link = spec_ticket_link.trim();
        if spec_ticket_link.is_empty() {
            return Err(DedupError::InvalidInput(
                "spec ticket link must not be empty".to_string(),
            ));
        }

        self.prepare().await?;

        let vector = self.embedder.embed(spec_ticket_content).await?;
        let mapping = TicketMapping {
            id: mapping_id(spec_ticket_link),
            spec_ticket_link: spec_ticket_link.to_string(),
            spec_ticket_content: spec_ticket_content.to_string(),
            spec_ticket_vector: vector,
            dev_ticket_link: dev_ticket_link.trim().to_string(),
            github_issue_link: github_issue_link.trim().to_string(),
            created_at: Utc::now(),
        };

        self.index
            .upsert(mapping.clone())
            .await
            .map_err(DedupError::index(IndexOperation::Upsert))?;

        info!("Recorded mapping {spec_ticket_link} -> {}", mapping.dev_ticket_link);
        Ok(mapping)
    }

    /// The `n` most recently recorded mappings, newest first.
    pub async fn recent_history(&self, n: usize) -> Result<RecentMappings> {
        self.prepare().await?;

        self.index
            .list_recent(n)
            .await
            .map_err(DedupError::index(IndexOperation::History))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn hit(id: &str, score: f32) -> ScoredMapping {
        ScoredMapping {
            score,
            mapping: TicketMapping {
                id: id.to_string(),
                spec_ticket_link: format!("https://x/browse/{id}"),
                spec_ticket_content: String::new(),
                spec_ticket_vector: Vec::new(),
                dev_ticket_link: String::new(),
                github_issue_link: String::new(),
                created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            },
        }
    }

    fn ids(hits: &[ScoredMapping]) -> Vec<&str> {
        hits.iter().map(|h| h.mapping.id.as_str()).collect()
    }

    #[test]
    fn test_select_matches_threshold_is_inclusive() {
        let hits = vec![hit("a", 0.84), hit("b", 0.85), hit("c", 0.97)];
        let selected = select_matches(hits, SIMILARITY_THRESHOLD);
        assert_eq!(ids(&selected), vec!["c", "b"]);
    }

    #[test]
    fn test_select_matches_keeps_index_order_on_ties() {
        let hits = vec![hit("x", 0.9), hit("y", 0.95), hit("z", 0.9)];
        let selected = select_matches(hits, 0.5);
        assert_eq!(ids(&selected), vec!["y", "x", "z"]);
    }

    #[test]
    fn test_duplicate_check_accessors() {
        assert!(!DuplicateCheck::NotFound.is_duplicate());
        assert!(DuplicateCheck::NotFound.best().is_none());

        let check = DuplicateCheck::Matches(vec![hit("a", 0.9)]);
        assert!(check.is_duplicate());
        assert_eq!(check.best().map(|h| h.mapping.id.as_str()), Some("a"));
    }
}
