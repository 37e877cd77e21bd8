//! CLI commands implementation

pub mod ask;
pub mod collections;
pub mod repl;
pub mod sync;

pub use ask::*;
pub use collections::*;
pub use repl::*;
pub use sync::*;

use crate::chat::RagSession;
use crate::config::Config;
use crate::embed::create_embedder;
use crate::error::Result;
use crate::ingest::IngestPipeline;
use crate::journal::{JsonFileJournal, LogSink};
use crate::llm::{GeminiClient, LanguageModel};
use crate::store::{FlatFileBackend, VectorStore};
use std::sync::Arc;
use tracing::debug;

/// The collaborators every command works with
pub struct Services {
    pub config: Config,
    pub model: Arc<dyn LanguageModel>,
    pub store: Arc<VectorStore>,
    pub journal: Arc<dyn LogSink>,
}

impl Services {
    /// Wire up Gemini, the file-backed index and the JSON journal
    pub async fn connect(config: Config) -> Result<Self> {
        let model: Arc<dyn LanguageModel> = Arc::new(GeminiClient::from_config(&config)?);
        let embedder = create_embedder(&config)?;
        let backend = FlatFileBackend::new(config.paths.storage_dir.clone(), embedder);
        let journal = JsonFileJournal::open(config.paths.log_dir.clone()).await?;

        debug!(
            "Using {} for answers, {} for embeddings, storage at {}",
            config.llm.model,
            config.embedding.model,
            config.paths.storage_dir.display()
        );

        Ok(Self {
            model,
            store: Arc::new(VectorStore::new(Arc::new(backend))),
            journal: Arc::new(journal),
            config,
        })
    }

    /// A fresh chat session
    pub fn session(&self) -> RagSession {
        RagSession::new(
            self.model.clone(),
            self.store.clone(),
            self.journal.clone(),
            &self.config.chat,
        )
    }

    pub fn pipeline(&self) -> IngestPipeline {
        IngestPipeline::new(self.store.clone(), &self.config)
    }
}
