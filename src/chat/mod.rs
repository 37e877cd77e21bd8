//! Conversational RAG orchestration
//!
//! A [`RagSession`] answers one question at a time against one collection:
//!
//! 1. Resolve the search query (rephrased from history when there is any)
//! 2. Retrieve chunks from the vector store
//! 3. Fall back to a fixed message when nothing was retrieved
//! 4. Generate an answer grounded in the retrieved chunks
//! 5. Record the exchange in history and in the interaction log
//!
//! Switching to a different collection starts a fresh conversation.

mod history;

pub use history::ChatHistory;

use crate::config::ChatConfig;
use crate::error::{Error, Result};
use crate::journal::LogSink;
use crate::llm::{prompts, LanguageModel};
use crate::models::{Document, LogEntry};
use crate::store::VectorStore;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Retrieval outcome shared by the blocking and streaming paths
struct Retrieval {
    query: String,
    documents: Vec<Document>,
}

/// One chat session bound to at most one collection at a time
pub struct RagSession {
    model: Arc<dyn LanguageModel>,
    store: Arc<VectorStore>,
    journal: Arc<dyn LogSink>,
    history: ChatHistory,
    collection: Option<String>,
    search_limit: usize,
    fallback_message: String,
}

impl RagSession {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        store: Arc<VectorStore>,
        journal: Arc<dyn LogSink>,
        config: &ChatConfig,
    ) -> Self {
        Self {
            model,
            store,
            journal,
            history: ChatHistory::new(config.max_history),
            collection: None,
            search_limit: config.search_limit,
            fallback_message: config.fallback_message.clone(),
        }
    }

    /// Answer `question` from the chunks stored in `collection`
    pub async fn ask(&mut self, question: &str, collection: &str) -> Result<String> {
        let retrieval = match self.retrieve(question, collection).await? {
            Some(retrieval) => retrieval,
            None => return Ok(self.fallback_message.clone()),
        };

        let prompt = grounded_prompt(&retrieval.documents, question);
        let answer = self
            .model
            .generate(&prompt, None)
            .await
            .map_err(|e| Error::GenerationFailed(e.to_string()))?;

        self.complete(question, collection, &retrieval, &answer).await;
        Ok(answer)
    }

    /// Like [`ask`](Self::ask), handing each generated fragment to
    /// `on_fragment` as it arrives. A fallback answer is delivered as a
    /// single fragment.
    pub async fn ask_streaming<F>(
        &mut self,
        question: &str,
        collection: &str,
        mut on_fragment: F,
    ) -> Result<String>
    where
        F: FnMut(&str) + Send,
    {
        let retrieval = match self.retrieve(question, collection).await? {
            Some(retrieval) => retrieval,
            None => {
                on_fragment(&self.fallback_message);
                return Ok(self.fallback_message.clone());
            }
        };

        let prompt = grounded_prompt(&retrieval.documents, question);
        let mut stream = self
            .model
            .stream(&prompt, None)
            .await
            .map_err(|e| Error::GenerationFailed(e.to_string()))?;

        let mut answer = String::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment.map_err(|e| Error::GenerationFailed(e.to_string()))?;
            on_fragment(&fragment);
            answer.push_str(&fragment);
        }

        if answer.trim().is_empty() {
            return Err(Error::GenerationFailed("empty response".to_string()));
        }

        self.complete(question, collection, &retrieval, &answer).await;
        Ok(answer)
    }

    /// Forget the conversation so far
    pub fn clear_context(&mut self) {
        self.history.clear();
        debug!("Chat history cleared");
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Collection of the current conversation
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Bind the session to `collection`, starting over if it changed
    fn enter(&mut self, collection: &str) {
        if self.collection.as_deref() != Some(collection) {
            if !self.history.is_empty() {
                info!("Switched to collection {}; starting a new conversation", collection);
            }
            self.history.clear();
            self.collection = Some(collection.to_string());
        }
    }

    /// Steps 1-3. `None` means the fallback was logged and should be returned.
    async fn retrieve(&mut self, question: &str, collection: &str) -> Result<Option<Retrieval>> {
        self.enter(collection);

        let query = self.resolve_query(question).await;
        let documents = self
            .store
            .search(&query, collection, self.search_limit)
            .await?;
        debug!("Retrieved {} chunks for {:?}", documents.len(), query);

        if documents.is_empty() {
            warn!("No relevant chunks in {} for {:?}", collection, query);
            let entry = LogEntry::new(collection, question, &query, 0, &self.fallback_message);
            self.record(&entry).await;
            return Ok(None);
        }

        Ok(Some(Retrieval { query, documents }))
    }

    /// Standalone search query for `question`; never fails
    async fn resolve_query(&self, question: &str) -> String {
        if self.history.is_empty() {
            return question.to_string();
        }

        let history = prompts::format_history(&self.history.turns());
        let prompt = prompts::rephrase_prompt(&history, question);
        match self.model.generate(&prompt, None).await {
            Ok(raw) => {
                let query = prompts::clean_query(&raw);
                if query.is_empty() {
                    warn!("Rephrasing produced an empty query, using the original question");
                    question.to_string()
                } else {
                    debug!("Rephrased {:?} as {:?}", question, query);
                    query
                }
            }
            Err(e) => {
                warn!("Rephrasing failed, using the original question: {}", e);
                question.to_string()
            }
        }
    }

    async fn complete(&mut self, question: &str, collection: &str, retrieval: &Retrieval, answer: &str) {
        self.history.push_exchange(question, answer);
        let entry = LogEntry::new(
            collection,
            question,
            &retrieval.query,
            retrieval.documents.len(),
            answer,
        );
        self.record(&entry).await;
    }

    async fn record(&self, entry: &LogEntry) {
        if let Err(e) = self.journal.append(entry).await {
            warn!("Failed to write interaction log: {}", e);
        }
    }
}

fn grounded_prompt(documents: &[Document], question: &str) -> String {
    prompts::grounded_prompt(&prompts::format_context(documents), question)
}
