//! Deterministic stand-ins for the external capabilities, used by the
//! unit tests.

use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::journal::LogSink;
use crate::llm::{frame_prompt, LanguageModel, TextStream};
use crate::models::{ChunkMetadata, Document, LogEntry};
use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const KEYWORD_DIMENSION: usize = 256;

/// A document tagged with `collection`
pub fn doc(collection: &str, source: &str, text: &str) -> Document {
    Document::new(text, ChunkMetadata::new(source, collection, Utc::now()))
}

/// Bag-of-words embedder: each lowercase token bumps one hashed bucket
pub struct KeywordEmbedder {
    name: String,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; KEYWORD_DIMENSION];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let bucket = token
                .bytes()
                .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
            vector[bucket as usize % KEYWORD_DIMENSION] += 1.0;
        }
        vector
    }
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self::named("keyword-test")
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

/// Language model that replays queued replies and records every prompt
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn reply(self, text: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(text.to_string()));
        self
    }

    /// Queue a failure
    pub fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(Error::Llm(message.to_string())));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn next(&self, prompt: &str, context: Option<&str>) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push(frame_prompt(prompt, context));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Llm("no scripted reply left".to_string())))
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str, context: Option<&str>) -> Result<String> {
        self.next(prompt, context)
    }

    async fn stream(&self, prompt: &str, context: Option<&str>) -> Result<TextStream> {
        let text = self.next(prompt, context)?;
        let fragments: Vec<Result<String>> = text
            .split_inclusive(' ')
            .map(|s| Ok(s.to_string()))
            .collect();
        Ok(stream::iter(fragments).boxed())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Log sink that keeps entries in memory
#[derive(Default)]
pub struct MemoryJournal {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryJournal {
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSink for MemoryJournal {
    async fn append(&self, entry: &LogEntry) -> Result<()> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}
