//! Vector index integration
//!
//! This module wraps an index backend and provides:
//! - The `VectorIndex` / `IndexBackend` capability traits
//! - A single cached index handle bound to one collection at a time
//! - Collection-scoped upsert (persisted before returning) and search

mod flat;

pub use flat::*;

use crate::error::{Error, Result};
use crate::models::Document;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// An open, in-memory index for one collection
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Append documents
    async fn add(&mut self, documents: Vec<Document>) -> Result<()>;

    /// Documents ranked by similarity to `query`, best first
    async fn similarity_search(&self, query: &str, limit: usize) -> Result<Vec<Document>>;

    /// Persist the full index to durable storage
    async fn save(&self) -> Result<()>;

    /// Number of stored documents
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Opens and creates indexes addressed by collection name
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Whether persisted state exists for the collection
    async fn exists(&self, collection: &str) -> Result<bool>;

    /// Load the persisted index
    async fn load(&self, collection: &str) -> Result<Box<dyn VectorIndex>>;

    /// Build a fresh, not yet persisted index from `documents`
    async fn create(&self, collection: &str, documents: Vec<Document>) -> Result<Box<dyn VectorIndex>>;
}

/// The cached handle and the collection it belongs to.
///
/// `bind` is the only way to change the binding; it drops the handle
/// whenever the target collection differs.
#[derive(Default)]
pub struct IndexSlot {
    bound: Option<String>,
    handle: Option<Box<dyn VectorIndex>>,
}

impl IndexSlot {
    /// Bind to `collection`, invalidating a handle that belongs elsewhere.
    /// Returns true if a handle was dropped.
    pub fn bind(&mut self, collection: &str) -> bool {
        if self.bound.as_deref() == Some(collection) {
            return false;
        }
        let dropped = self.handle.take().is_some();
        if dropped {
            debug!(
                "Invalidating index handle for {:?} before using {}",
                self.bound, collection
            );
        }
        self.bound = Some(collection.to_string());
        dropped
    }

    pub fn bound(&self) -> Option<&str> {
        self.bound.as_deref()
    }

    pub fn has_handle(&self) -> bool {
        self.handle.is_some()
    }
}

/// Collection-aware vector store with one cached index handle
pub struct VectorStore {
    backend: Arc<dyn IndexBackend>,
    slot: Mutex<IndexSlot>,
}

impl VectorStore {
    pub fn new(backend: Arc<dyn IndexBackend>) -> Self {
        Self {
            backend,
            slot: Mutex::new(IndexSlot::default()),
        }
    }

    /// Append documents to `collection` and persist the index.
    ///
    /// Every document must already be tagged with `collection`.
    pub async fn upsert(&self, documents: Vec<Document>, collection: &str) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        if let Some(stray) = documents
            .iter()
            .find(|d| d.metadata.collection != collection)
        {
            return Err(Error::Index(format!(
                "Document from {} is tagged '{}' but was sent to collection '{}'",
                stray.metadata.source, stray.metadata.collection, collection
            )));
        }

        let mut slot = self.slot.lock().await;
        slot.bind(collection);

        let count = documents.len();

        // Taken out so a failed write leaves no half-mutated handle behind;
        // the next call reloads from disk instead.
        let handle = match slot.handle.take() {
            Some(mut handle) => {
                handle.add(documents).await?;
                handle
            }
            None => {
                if self.backend.exists(collection).await? {
                    debug!("Loading persisted index for {}", collection);
                    let mut handle = self.backend.load(collection).await?;
                    handle.add(documents).await?;
                    handle
                } else {
                    info!("Creating new index for collection {}", collection);
                    self.backend.create(collection, documents).await?
                }
            }
        };

        handle.save().await?;
        debug!(
            "Upserted {} documents into {} ({} total)",
            count,
            collection,
            handle.len()
        );
        slot.handle = Some(handle);

        Ok(())
    }

    /// Search `collection`; a collection with no persisted index yields no
    /// results rather than an error.
    pub async fn search(&self, query: &str, collection: &str, limit: usize) -> Result<Vec<Document>> {
        if limit == 0 {
            return Err(Error::Index("search limit must be positive".to_string()));
        }

        let mut slot = self.slot.lock().await;
        slot.bind(collection);

        if slot.handle.is_none() {
            if !self.backend.exists(collection).await? {
                warn!("Collection \"{}\" not found in storage", collection);
                return Ok(Vec::new());
            }
            debug!("Loading persisted index for {}", collection);
            slot.handle = Some(self.backend.load(collection).await?);
        }

        match slot.handle.as_ref() {
            Some(handle) => handle.similarity_search(query, limit).await,
            None => Ok(Vec::new()),
        }
    }

    /// Drop the cached handle, e.g. after the storage root was wiped
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        *slot = IndexSlot::default();
    }

    /// Collection the cached handle is bound to
    pub async fn current_collection(&self) -> Option<String> {
        self.slot.lock().await.bound().map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;
    use crate::testing::{doc, KeywordEmbedder};
    use chrono::Utc;
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> VectorStore {
        let backend = FlatFileBackend::new(tmp.path(), Arc::new(KeywordEmbedder::default()));
        VectorStore::new(Arc::new(backend))
    }

    #[tokio::test]
    async fn test_slot_bind_invalidates_on_switch() {
        let tmp = TempDir::new().unwrap();
        let backend = FlatFileBackend::new(tmp.path(), Arc::new(KeywordEmbedder::default()));

        let mut slot = IndexSlot::default();
        assert!(!slot.bind("a"));
        assert_eq!(slot.bound(), Some("a"));
        assert!(!slot.bind("b")); // nothing cached yet

        slot.handle = Some(
            backend
                .create("b", vec![doc("b", "x.txt", "alpha beta")])
                .await
                .unwrap(),
        );
        assert!(!slot.bind("b"));
        assert!(slot.has_handle());

        assert!(slot.bind("a"));
        assert_eq!(slot.bound(), Some("a"));
        assert!(!slot.has_handle());
    }

    #[tokio::test]
    async fn test_search_unpopulated_collection_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);

        let results = store.search("anything", "docs", 5).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(store.current_collection().await.as_deref(), Some("docs"));
    }

    #[tokio::test]
    async fn test_search_rejects_zero_limit() {
        let tmp = TempDir::new().unwrap();
        let err = store(&tmp).search("q", "docs", 0).await.unwrap_err();
        assert!(matches!(err, Error::Index(_)));
    }

    #[tokio::test]
    async fn test_upsert_persists_before_returning() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);

        store
            .upsert(vec![doc("docs", "a.txt", "rust ownership rules")], "docs")
            .await
            .unwrap();
        assert!(tmp.path().join("docs").join("docstore.json").exists());

        // A fresh store (cold cache) sees the persisted data
        let cold = self::store(&tmp);
        let results = cold.search("ownership", "docs", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "rust ownership rules");
    }

    #[tokio::test]
    async fn test_upsert_appends_to_persisted_index() {
        let tmp = TempDir::new().unwrap();
        store(&tmp)
            .upsert(vec![doc("docs", "a.txt", "first chunk")], "docs")
            .await
            .unwrap();

        let second = store(&tmp);
        second
            .upsert(vec![doc("docs", "b.txt", "second chunk")], "docs")
            .await
            .unwrap();

        let results = second.search("chunk", "docs", 10).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_switching_collection_never_leaks() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);

        store
            .upsert(vec![doc("alpha", "a.txt", "shared words here")], "alpha")
            .await
            .unwrap();
        store
            .upsert(vec![doc("beta", "b.txt", "shared words there")], "beta")
            .await
            .unwrap();
        store
            .upsert(vec![doc("alpha", "c.txt", "more shared words")], "alpha")
            .await
            .unwrap();

        let beta = store.search("shared words", "beta", 10).await.unwrap();
        assert_eq!(beta.len(), 1);
        assert!(beta.iter().all(|d| d.metadata.collection == "beta"));

        let gamma = store.search("shared words", "gamma", 10).await.unwrap();
        assert!(gamma.is_empty());

        let alpha = store.search("shared words", "alpha", 10).await.unwrap();
        assert_eq!(alpha.len(), 2);
        assert!(alpha.iter().all(|d| d.metadata.collection == "alpha"));
    }

    #[tokio::test]
    async fn test_upsert_rejects_mistagged_documents() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);

        let stray = Document::new("x", ChunkMetadata::new("a.txt", "other", Utc::now()));
        let err = store.upsert(vec![stray], "docs").await.unwrap_err();
        assert!(matches!(err, Error::Index(_)));
        assert!(!tmp.path().join("docs").exists());
    }

    #[tokio::test]
    async fn test_invalidate_drops_handle() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store
            .upsert(vec![doc("docs", "a.txt", "text")], "docs")
            .await
            .unwrap();

        store.invalidate().await;
        assert!(store.current_collection().await.is_none());

        std::fs::remove_dir_all(tmp.path().join("docs")).unwrap();
        assert!(store.search("text", "docs", 5).await.unwrap().is_empty());
    }
}
