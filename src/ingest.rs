//! Ingestion pipeline
//!
//! Per file: validate extension, load text, split into chunks, tag each
//! chunk with its collection and ingestion time, then upsert the chunks in
//! fixed-size batches, strictly one after another, pausing between batches.

use crate::chunk::split_text;
use crate::config::{ChunkConfig, Config};
use crate::error::{Error, Result};
use crate::models::{BatchProgress, ChunkMetadata, Document};
use crate::store::VectorStore;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Indexed { chunks: usize, batches: usize },
    Skipped { reason: String },
}

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub path: PathBuf,
    pub collection: String,
    pub outcome: IngestOutcome,
}

impl IngestReport {
    pub fn chunks(&self) -> usize {
        match self.outcome {
            IngestOutcome::Indexed { chunks, .. } => chunks,
            IngestOutcome::Skipped { .. } => 0,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, IngestOutcome::Skipped { .. })
    }
}

/// Turns files into tagged chunks in the vector store
pub struct IngestPipeline {
    store: Arc<VectorStore>,
    chunking: ChunkConfig,
    batch_size: usize,
    delay: Duration,
    extension: String,
}

impl IngestPipeline {
    pub fn new(store: Arc<VectorStore>, config: &Config) -> Self {
        Self {
            store,
            chunking: config.chunk.clone(),
            batch_size: config.ingest.batch_size.max(1),
            delay: Duration::from_millis(config.ingest.delay_ms),
            extension: config
                .ingest
                .extension
                .trim_start_matches('.')
                .to_lowercase(),
        }
    }

    /// Pause between batches
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The single accepted extension, without the dot
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }

    /// Ingest one file into `collection`, calling `on_progress` after each
    /// batch has been persisted.
    ///
    /// Files with another extension are skipped, not rejected. On failure
    /// the remaining batches are abandoned; batches already written stay.
    pub async fn ingest_file<F>(
        &self,
        path: &Path,
        collection: &str,
        mut on_progress: F,
    ) -> Result<IngestReport>
    where
        F: FnMut(BatchProgress) + Send,
    {
        if !self.accepts(path) {
            let reason = format!("only .{} files are ingested", self.extension);
            warn!("Skipping {}: {}", path.display(), reason);
            return Ok(IngestReport {
                path: path.to_path_buf(),
                collection: collection.to_string(),
                outcome: IngestOutcome::Skipped { reason },
            });
        }

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ingest_error(path, 0, 0, e.into()))?;

        let documents = self.build_documents(&text, &path.display().to_string(), collection, Utc::now());
        let total = documents.len();
        let batches = total.div_ceil(self.batch_size);
        debug!(
            "Split {} into {} chunks ({} batches)",
            path.display(),
            total,
            batches
        );

        let mut indexed = 0;
        let mut pending = documents.into_iter().peekable();
        let mut batch = 0;
        while pending.peek().is_some() {
            let chunk: Vec<Document> = pending.by_ref().take(self.batch_size).collect();
            let size = chunk.len();
            batch += 1;

            self.store
                .upsert(chunk, collection)
                .await
                .map_err(|e| ingest_error(path, indexed, total, e))?;
            indexed += size;

            on_progress(BatchProgress {
                batch,
                batches,
                indexed,
                total,
            });

            if batch < batches && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        info!(
            "Indexed {} chunks from {} into {}",
            total,
            path.display(),
            collection
        );
        Ok(IngestReport {
            path: path.to_path_buf(),
            collection: collection.to_string(),
            outcome: IngestOutcome::Indexed {
                chunks: total,
                batches,
            },
        })
    }

    /// Split `text` and tag every chunk for `collection`
    pub fn build_documents(
        &self,
        text: &str,
        source: &str,
        collection: &str,
        ingested_at: DateTime<Utc>,
    ) -> Vec<Document> {
        split_text(text, &self.chunking)
            .into_iter()
            .map(|chunk| {
                let metadata = ChunkMetadata::new(source, collection, ingested_at)
                    .with("chunkIndex", chunk.index)
                    .with("hash", chunk.hash);
                Document::new(chunk.text, metadata)
            })
            .collect()
    }
}

fn ingest_error(path: &Path, chunks_persisted: usize, total_chunks: usize, source: Error) -> Error {
    Error::Ingest {
        path: path.to_path_buf(),
        chunks_persisted,
        total_chunks,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::Embedder;
    use crate::store::FlatFileBackend;
    use crate::testing::KeywordEmbedder;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.chunk = ChunkConfig {
            size: 120,
            overlap: 20,
        };
        config.ingest.batch_size = 3;
        config.ingest.delay_ms = 0;
        config
    }

    fn pipeline(tmp: &TempDir, embedder: Arc<dyn Embedder>) -> (IngestPipeline, Arc<VectorStore>) {
        let backend = FlatFileBackend::new(tmp.path().join("storage"), embedder);
        let store = Arc::new(VectorStore::new(Arc::new(backend)));
        (IngestPipeline::new(store.clone(), &test_config()), store)
    }

    fn sample_text() -> String {
        (0..40)
            .map(|i| format!("Sentence number {} talks about topic {}.", i, i * 7))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn write_file(tmp: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = tmp.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_progress_reports_per_batch() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&tmp, Arc::new(KeywordEmbedder::default()));
        let text = sample_text();
        let path = write_file(&tmp, "notes.txt", &text);

        let n = split_text(&text, &test_config().chunk).len();
        assert!(n > 3);

        let mut reports = Vec::new();
        let report = pipeline
            .ingest_file(&path, "docs", |p| reports.push(p))
            .await
            .unwrap();

        assert_eq!(reports.len(), n.div_ceil(3));
        assert_eq!(reports.last().unwrap().indexed, n);
        assert!(reports.windows(2).all(|w| w[0].indexed < w[1].indexed));
        assert!(reports.iter().enumerate().all(|(i, p)| p.batch == i + 1));
        assert_eq!(report.chunks(), n);
    }

    #[tokio::test]
    async fn test_ingested_text_is_searchable() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, store) = pipeline(&tmp, Arc::new(KeywordEmbedder::default()));
        let path = write_file(&tmp, "notes.txt", &sample_text());

        pipeline.ingest_file(&path, "docs", |_| {}).await.unwrap();

        let results = store.search("topic 91", "docs", 100).await.unwrap();
        let hit = results
            .iter()
            .find(|d| d.text.contains("topic 91"))
            .expect("chunk containing the substring");
        assert_eq!(hit.metadata.collection, "docs");
        assert_eq!(hit.metadata.source, path.display().to_string());
        assert!(hit.metadata.extra.contains_key("chunkIndex"));
    }

    #[tokio::test]
    async fn test_other_extensions_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let embedder = Arc::new(KeywordEmbedder::default());
        let (pipeline, _) = pipeline(&tmp, embedder.clone());
        let path = write_file(&tmp, "notes.md", "# not ingested");

        let mut calls = 0;
        let report = pipeline
            .ingest_file(&path, "docs", |_| calls += 1)
            .await
            .unwrap();

        assert!(report.is_skipped());
        assert_eq!(calls, 0);
        assert_eq!(embedder.calls(), 0);
        assert!(!tmp.path().join("storage").join("docs").exists());
    }

    #[tokio::test]
    async fn test_extension_match_ignores_case_and_dot() {
        let tmp = TempDir::new().unwrap();
        let backend = FlatFileBackend::new(tmp.path(), Arc::new(KeywordEmbedder::default()));
        let store = Arc::new(VectorStore::new(Arc::new(backend)));
        let mut config = test_config();
        config.ingest.extension = ".TXT".to_string();
        let pipeline = IngestPipeline::new(store, &config);

        assert_eq!(pipeline.extension(), "txt");
        assert!(pipeline.accepts(Path::new("a/B.Txt")));
        assert!(!pipeline.accepts(Path::new("a/txt")));
    }

    #[tokio::test]
    async fn test_missing_file_is_ingest_error() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&tmp, Arc::new(KeywordEmbedder::default()));
        let path = tmp.path().join("gone.txt");

        match pipeline.ingest_file(&path, "docs", |_| {}).await {
            Err(Error::Ingest {
                path: failed,
                chunks_persisted,
                ..
            }) => {
                assert_eq!(failed, path);
                assert_eq!(chunks_persisted, 0);
            }
            other => panic!("expected ingest error, got {other:?}"),
        }
    }

    /// Fails every embedding call after the first `ok` ones
    struct FlakyEmbedder {
        inner: KeywordEmbedder,
        ok: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.ok {
                return Err(Error::Embedding("provider unavailable".to_string()));
            }
            self.inner.embed(texts).await
        }

        fn model_name(&self) -> &str {
            self.inner.model_name()
        }
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_batches() {
        let tmp = TempDir::new().unwrap();
        let embedder = Arc::new(FlakyEmbedder {
            inner: KeywordEmbedder::default(),
            ok: 1,
            calls: AtomicUsize::new(0),
        });
        let (pipeline, _) = pipeline(&tmp, embedder.clone());
        let path = write_file(&tmp, "notes.txt", &sample_text());
        let n = split_text(&sample_text(), &test_config().chunk).len();

        let mut reports = Vec::new();
        let err = pipeline
            .ingest_file(&path, "docs", |p| reports.push(p))
            .await
            .unwrap_err();

        match err {
            Error::Ingest {
                chunks_persisted,
                total_chunks,
                source,
                ..
            } => {
                assert_eq!(chunks_persisted, 3);
                assert_eq!(total_chunks, n);
                assert!(matches!(*source, Error::Embedding(_)));
            }
            other => panic!("expected ingest error, got {other:?}"),
        }
        assert_eq!(reports.len(), 1);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);

        // The first batch survived on disk
        let cold = FlatFileBackend::new(
            tmp.path().join("storage"),
            Arc::new(KeywordEmbedder::default()),
        );
        let store = VectorStore::new(Arc::new(cold));
        assert_eq!(store.search("topic", "docs", 100).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_pauses_between_batches() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&tmp, Arc::new(KeywordEmbedder::default()));
        let pipeline = pipeline.with_delay(Duration::from_millis(25));
        let text = sample_text();
        let path = write_file(&tmp, "notes.txt", &text);
        let batches = split_text(&text, &test_config().chunk).len().div_ceil(3);

        let started = std::time::Instant::now();
        pipeline.ingest_file(&path, "docs", |_| {}).await.unwrap();

        let minimum = Duration::from_millis(25) * (batches as u32 - 1);
        assert!(started.elapsed() >= minimum);
    }

    #[tokio::test]
    async fn test_empty_file_indexes_nothing() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(&tmp, Arc::new(KeywordEmbedder::default()));
        let path = write_file(&tmp, "empty.txt", "   \n");

        let report = pipeline.ingest_file(&path, "docs", |_| {}).await.unwrap();
        assert_eq!(
            report.outcome,
            IngestOutcome::Indexed {
                chunks: 0,
                batches: 0
            }
        );
    }
}
