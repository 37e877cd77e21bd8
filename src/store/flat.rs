//! File-backed flat index: every vector is kept in memory and scored
//! against the query by cosine similarity.
//!
//! On-disk layout, one directory per collection:
//!
//! ```text
//! <root>/<collection>/docstore.json   entries {id, text, metadata, vector}
//! <root>/<collection>/args.json       {embedding_model, dimension, count}
//! ```

use super::{IndexBackend, VectorIndex};
use crate::chunk::compute_text_hash;
use crate::embed::{embed_in_batches, Embedder, MAX_EMBED_BATCH};
use crate::error::{Error, Result};
use crate::models::{ChunkMetadata, Document};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const DOCSTORE_FILE: &str = "docstore.json";
const ARGS_FILE: &str = "args.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    id: String,
    text: String,
    metadata: ChunkMetadata,
    vector: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexArgs {
    embedding_model: String,
    dimension: Option<usize>,
    count: usize,
}

/// Backend storing each collection under `root/<collection>`
pub struct FlatFileBackend {
    root: PathBuf,
    embedder: Arc<dyn Embedder>,
}

impl FlatFileBackend {
    pub fn new(root: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            root: root.into(),
            embedder,
        }
    }

    /// Directory of a collection; names must be a single plain path component
    pub fn collection_dir(&self, collection: &str) -> Result<PathBuf> {
        let valid = !collection.is_empty()
            && collection != "."
            && collection != ".."
            && !collection.contains(['/', '\\']);
        if !valid {
            return Err(Error::Index(format!(
                "Invalid collection name '{}'",
                collection
            )));
        }
        Ok(self.root.join(collection))
    }
}

#[async_trait]
impl IndexBackend for FlatFileBackend {
    async fn exists(&self, collection: &str) -> Result<bool> {
        let path = self.collection_dir(collection)?.join(DOCSTORE_FILE);
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn load(&self, collection: &str) -> Result<Box<dyn VectorIndex>> {
        let dir = self.collection_dir(collection)?;
        let entries: Vec<StoredEntry> = read_json(&dir.join(DOCSTORE_FILE)).await?;

        let args_path = dir.join(ARGS_FILE);
        let dimension = if tokio::fs::try_exists(&args_path).await? {
            let args: IndexArgs = read_json(&args_path).await?;
            if args.embedding_model != self.embedder.model_name() {
                return Err(Error::Index(format!(
                    "Collection '{}' was indexed with '{}' but the configured embedding model is '{}'; re-index it",
                    collection,
                    args.embedding_model,
                    self.embedder.model_name()
                )));
            }
            args.dimension
        } else {
            entries.first().map(|e| e.vector.len())
        };

        if let Some(dim) = dimension {
            if let Some(bad) = entries.iter().find(|e| e.vector.len() != dim) {
                return Err(Error::Index(format!(
                    "Corrupt index for '{}': entry {} has dimension {}, expected {}",
                    collection,
                    bad.id,
                    bad.vector.len(),
                    dim
                )));
            }
        }

        debug!("Loaded {} entries for {}", entries.len(), collection);
        Ok(Box::new(FlatIndex {
            dir,
            embedder: self.embedder.clone(),
            entries,
            dimension,
        }))
    }

    async fn create(&self, collection: &str, documents: Vec<Document>) -> Result<Box<dyn VectorIndex>> {
        let mut index = FlatIndex {
            dir: self.collection_dir(collection)?,
            embedder: self.embedder.clone(),
            entries: Vec::new(),
            dimension: None,
        };
        index.add(documents).await?;
        Ok(Box::new(index))
    }
}

/// In-memory index for one collection
pub struct FlatIndex {
    dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    entries: Vec<StoredEntry>,
    dimension: Option<usize>,
}

#[async_trait]
impl VectorIndex for FlatIndex {
    async fn add(&mut self, documents: Vec<Document>) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = embed_in_batches(self.embedder.as_ref(), texts, MAX_EMBED_BATCH).await?;

        let mut dimension = self.dimension;
        for vector in &vectors {
            match dimension {
                Some(dim) if dim != vector.len() => {
                    return Err(Error::Index(format!(
                        "Vector dimension mismatch: index has {}, embedding has {}",
                        dim,
                        vector.len()
                    )));
                }
                Some(_) => {}
                None => dimension = Some(vector.len()),
            }
        }
        self.dimension = dimension;

        let start = self.entries.len();
        for (offset, (doc, vector)) in documents.into_iter().zip(vectors).enumerate() {
            let id = compute_text_hash(&format!(
                "{}\u{0}{}\u{0}{}",
                start + offset,
                doc.metadata.source,
                doc.text
            ));
            self.entries.push(StoredEntry {
                id,
                text: doc.text,
                metadata: doc.metadata,
                vector,
            });
        }

        Ok(())
    }

    async fn similarity_search(&self, query: &str, limit: usize) -> Result<Vec<Document>> {
        if self.entries.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("No embedding returned".to_string()))?;

        if let Some(dim) = self.dimension {
            if query_vector.len() != dim {
                return Err(Error::Index(format!(
                    "Query dimension {} does not match index dimension {}",
                    query_vector.len(),
                    dim
                )));
            }
        }

        let mut scored: Vec<(f32, &StoredEntry)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(&query_vector, &entry.vector), entry))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, entry)| Document::new(entry.text.clone(), entry.metadata.clone()))
            .collect())
    }

    async fn save(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        write_json_atomic(&self.dir.join(DOCSTORE_FILE), &self.entries).await?;
        let args = IndexArgs {
            embedding_model: self.embedder.model_name().to_string(),
            dimension: self.dimension,
            count: self.entries.len(),
        };
        write_json_atomic(&self.dir.join(ARGS_FILE), &args).await?;

        debug!("Saved {} entries to {:?}", self.entries.len(), self.dir);
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Cosine similarity; zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::Index(format!("Failed to read {}: {}", path.display(), e)))
}

async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{doc, KeywordEmbedder};
    use tempfile::TempDir;

    fn backend(tmp: &TempDir) -> FlatFileBackend {
        FlatFileBackend::new(tmp.path(), Arc::new(KeywordEmbedder::default()))
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_collection_dir_rejects_paths() {
        let tmp = TempDir::new().unwrap();
        let backend = backend(&tmp);

        assert!(backend.collection_dir("docs").is_ok());
        assert!(backend.collection_dir("").is_err());
        assert!(backend.collection_dir("..").is_err());
        assert!(backend.collection_dir("a/b").is_err());
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let tmp = TempDir::new().unwrap();
        let backend = backend(&tmp);

        let index = backend
            .create(
                "docs",
                vec![
                    doc("docs", "a.txt", "cooking pasta with tomato sauce"),
                    doc("docs", "b.txt", "tuning the rust borrow checker"),
                    doc("docs", "c.txt", "gardening in spring"),
                ],
            )
            .await
            .unwrap();

        let results = index.similarity_search("rust borrow", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].metadata.source, "b.txt");
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let backend = backend(&tmp);

        assert!(!backend.exists("docs").await.unwrap());
        let index = backend
            .create("docs", vec![doc("docs", "a.txt", "persisted text")])
            .await
            .unwrap();
        assert!(!backend.exists("docs").await.unwrap());

        index.save().await.unwrap();
        assert!(backend.exists("docs").await.unwrap());

        let loaded = backend.load("docs").await.unwrap();
        assert_eq!(loaded.len(), 1);
        let results = loaded.similarity_search("persisted", 1).await.unwrap();
        assert_eq!(results[0].text, "persisted text");
        assert_eq!(results[0].metadata.collection, "docs");
    }

    #[tokio::test]
    async fn test_load_rejects_other_embedding_model() {
        let tmp = TempDir::new().unwrap();
        let index = backend(&tmp)
            .create("docs", vec![doc("docs", "a.txt", "text")])
            .await
            .unwrap();
        index.save().await.unwrap();

        let other = FlatFileBackend::new(
            tmp.path(),
            Arc::new(KeywordEmbedder::named("another-model")),
        );
        match other.load("docs").await {
            Err(Error::Index(message)) => assert!(message.contains("another-model")),
            Err(other) => panic!("expected index error, got {other:?}"),
            Ok(_) => panic!("expected index error"),
        }
    }

    #[tokio::test]
    async fn test_load_rejects_corrupt_docstore() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("docs");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(DOCSTORE_FILE), "[{\"id\": 1}]").unwrap();

        assert!(matches!(
            backend(&tmp).load("docs").await,
            Err(Error::Index(_))
        ));
    }
}
