//! In-process vector index with optional JSON file persistence.
//!
//! Search is exact cosine similarity over every stored vector, so scores are
//! raw cosine values.
//!
//! Upserts on one handle persist one at a time, and the store file is
//! replaced by rename so it is never left half written. Each process keeps
//! its own copy of the documents, so a store file should have one writer
//! process at a time.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, info};

use sdd_embeddings::find_top_k;

use crate::document::{RecentMappings, ScoredMapping, TicketMapping};
use crate::error::Result;
use crate::schema::DEFAULT_INDEX_NAME;
use crate::store::{VectorIndex, check_dimension};

/// A vector index held in memory.
pub struct MemoryIndex {
    /// Collection name, for logs and reports.
    name: String,

    /// Expected dimension of vectors.
    dimension: usize,

    /// Stored documents by id.
    entries: RwLock<HashMap<String, TicketMapping>>,

    /// File the documents are mirrored to, if any.
    store_path: Option<PathBuf>,

    /// Set once the storage location has been prepared.
    schema_ready: OnceCell<()>,

    /// Held from snapshot to rename so concurrent upserts persist in turn.
    persist_lock: Mutex<()>,
}

impl MemoryIndex {
    /// Create an empty, non-persistent index.
    pub fn new(dimension: usize) -> Self {
        Self {
            name: DEFAULT_INDEX_NAME.to_string(),
            dimension,
            entries: RwLock::new(HashMap::new()),
            store_path: None,
            schema_ready: OnceCell::new(),
            persist_lock: Mutex::new(()),
        }
    }

    /// Open an index mirrored to `path`, loading existing documents.
    pub async fn with_persistence(path: impl AsRef<Path>, dimension: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut entries = HashMap::new();
        if fs::try_exists(&path).await? {
            let content = fs::read_to_string(&path).await?;
            let stored: Vec<TicketMapping> = serde_json::from_str(&content)?;
            for mapping in stored {
                check_dimension(dimension, &mapping.spec_ticket_vector)?;
                entries.insert(mapping.id.clone(), mapping);
            }
            info!("Loaded {} ticket mappings from {}", entries.len(), path.display());
        }

        Ok(Self {
            entries: RwLock::new(entries),
            store_path: Some(path),
            ..Self::new(dimension)
        })
    }

    /// Set the collection name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check if the index is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn prepare_storage(&self) -> Result<()> {
        if let Some(parent) = self.store_path.as_deref().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        debug!("Memory index '{}' ready", self.name);
        Ok(())
    }

    /// Write every stored document plus `pending` to the store file.
    ///
    /// Callers hold `persist_lock`, so snapshots and renames never interleave.
    async fn save_with(&self, path: &Path, pending: &TicketMapping) -> Result<()> {
        let content = {
            let entries = self.entries.read().await;
            let mut stored: Vec<&TicketMapping> = entries
                .values()
                .filter(|m| m.id != pending.id)
                .chain(std::iter::once(pending))
                .collect();
            stored.sort_by(|a, b| a.id.cmp(&b.id));
            serde_json::to_string(&stored)?
        };

        self.prepare_storage().await?;
        let tmp = tmp_path(path);
        let written = match fs::write(&tmp, content).await {
            Ok(()) => fs::rename(&tmp, path).await,
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            fs::remove_file(&tmp).await.ok();
            return Err(err.into());
        }
        debug!("Saved ticket mappings to {}", path.display());
        Ok(())
    }
}

/// A temp file next to `path`, unique per process and write.
fn tmp_path(path: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let seq = NEXT.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(format!(".{}.{seq}.tmp", std::process::id()));
    path.with_file_name(name)
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| self.prepare_storage())
            .await?;
        Ok(())
    }

    async fn search_similar(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredMapping>> {
        check_dimension(self.dimension, vector)?;

        let entries = self.entries.read().await;
        let candidates = entries
            .values()
            .map(|m| (m.id.as_str(), m.spec_ticket_vector.as_slice()));
        let ranked = find_top_k(vector, candidates, k, f32::MIN)?;

        Ok(ranked
            .into_iter()
            .filter_map(|hit| {
                entries.get(&hit.id).map(|mapping| ScoredMapping {
                    score: hit.score,
                    mapping: mapping.clone(),
                })
            })
            .collect())
    }

    async fn upsert(&self, mapping: TicketMapping) -> Result<()> {
        check_dimension(self.dimension, &mapping.spec_ticket_vector)?;

        // The map only changes once the file holds the new document.
        let _persist = self.persist_lock.lock().await;
        if let Some(path) = self.store_path.as_deref() {
            self.save_with(path, &mapping).await?;
        }

        let id = mapping.id.clone();
        let replaced = self.entries.write().await.insert(id.clone(), mapping).is_some();
        debug!("Upserted ticket mapping {id} (replaced: {replaced})");
        Ok(())
    }

    async fn list_recent(&self, n: usize) -> Result<RecentMappings> {
        let entries = self.entries.read().await;
        let mut mappings: Vec<&TicketMapping> = entries.values().collect();
        mappings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(RecentMappings {
            mappings: mappings.into_iter().take(n).cloned().collect(),
            total: Some(entries.len() as u64),
        })
    }

    async fn get(&self, id: &str) -> Result<Option<TicketMapping>> {
        Ok(self.entries.read().await.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn mapping(id: &str, vector: Vec<f32>, minute: u32) -> TicketMapping {
        TicketMapping {
            id: id.to_string(),
            spec_ticket_link: format!("https://x/browse/{id}"),
            spec_ticket_content: format!("content of {id}"),
            spec_ticket_vector: vector,
            dev_ticket_link: format!("https://x/browse/DEV-{id}"),
            github_issue_link: format!("https://github.com/o/r/issues/{minute}"),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, minute, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_search_ranks_by_cosine() {
        let index = MemoryIndex::new(2);
        index.upsert(mapping("a", vec![1.0, 0.0], 0)).await.unwrap();
        index.upsert(mapping("b", vec![0.0, 1.0], 1)).await.unwrap();
        index.upsert(mapping("c", vec![0.8, 0.6], 2)).await.unwrap();

        let hits = index.search_similar(&[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.mapping.id.as_str()).collect();

        assert_eq!(ids, vec!["a", "c"]);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert!((hits[1].score - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id() {
        let index = MemoryIndex::new(2);
        index.upsert(mapping("a", vec![1.0, 0.0], 0)).await.unwrap();

        let mut updated = mapping("a", vec![0.0, 1.0], 5);
        updated.dev_ticket_link = "https://x/browse/DEV-99".to_string();
        index.upsert(updated.clone()).await.unwrap();

        assert_eq!(index.len().await, 1);
        assert_eq!(index.get("a").await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let index = MemoryIndex::new(3);
        let err = index.upsert(mapping("a", vec![1.0, 0.0], 0)).await.unwrap_err();

        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn test_list_recent_newest_first() {
        let index = MemoryIndex::new(2);
        for (id, minute) in [("a", 10), ("b", 30), ("c", 20)] {
            index.upsert(mapping(id, vec![1.0, 0.0], minute)).await.unwrap();
        }

        let recent = index.list_recent(2).await.unwrap();
        let ids: Vec<&str> = recent.mappings.iter().map(|m| m.id.as_str()).collect();

        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(recent.total, Some(3));
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/tickets.json");

        let index = MemoryIndex::with_persistence(&path, 2).await.unwrap();
        index.ensure_schema().await.unwrap();
        index.upsert(mapping("a", vec![0.6, 0.8], 0)).await.unwrap();
        drop(index);

        let reopened = MemoryIndex::with_persistence(&path, 2).await.unwrap();
        assert_eq!(reopened.len().await, 1);
        assert_eq!(
            reopened.get("a").await.unwrap().map(|m| m.spec_ticket_vector),
            Some(vec![0.6, 0.8])
        );
    }

    #[tokio::test]
    async fn test_persisted_dimension_is_checked() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tickets.json");

        let index = MemoryIndex::with_persistence(&path, 2).await.unwrap();
        index.upsert(mapping("a", vec![0.6, 0.8], 0)).await.unwrap();

        let result = MemoryIndex::with_persistence(&path, 3).await;
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_all_persist() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tickets.json");
        let index = Arc::new(MemoryIndex::with_persistence(&path, 2).await.unwrap());

        let tasks: Vec<_> = (0..32u32)
            .map(|i| {
                let index = Arc::clone(&index);
                tokio::spawn(async move {
                    index
                        .upsert(mapping(&format!("t{i:02}"), vec![1.0, 0.0], i))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(index.len().await, 32);
        let reopened = MemoryIndex::with_persistence(&path, 2).await.unwrap();
        assert_eq!(reopened.len().await, 32);
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_failed_save_leaves_index_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tickets.json");
        let index = MemoryIndex::with_persistence(&path, 2).await.unwrap();
        // Renaming onto a directory fails after the temp file is written.
        std::fs::create_dir(&path).unwrap();

        let result = index.upsert(mapping("a", vec![1.0, 0.0], 0)).await;

        assert!(result.is_err());
        assert_eq!(index.get("a").await.unwrap(), None);
        assert!(index.is_empty().await);
        assert!(index.list_recent(5).await.unwrap().is_empty());
        assert!(index.search_similar(&[1.0, 0.0], 5).await.unwrap().is_empty());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }
}
