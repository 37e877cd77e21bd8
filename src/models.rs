//! Shared data types: chat turns, tagged documents and log entries.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Who produced a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Label used when serializing history into a prompt
    pub fn prompt_label(&self) -> &'static str {
        match self {
            ChatRole::User => "User",
            ChatRole::Assistant => "AI",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Metadata attached to every stored chunk.
///
/// `source`, `collection` and `ingested_at` are required; anything else the
/// loader or splitter knows goes into `extra` as scalar JSON values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Path of the file the chunk came from
    pub source: String,

    /// Collection the chunk belongs to
    pub collection: String,

    /// When the chunk was ingested
    #[serde(rename = "ingestedAt")]
    pub ingested_at: DateTime<Utc>,

    /// Additional scalar metadata (chunk index, character offsets, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ChunkMetadata {
    pub fn new(
        source: impl Into<String>,
        collection: impl Into<String>,
        ingested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.into(),
            collection: collection.into(),
            ingested_at,
            extra: BTreeMap::new(),
        }
    }

    /// Attach an extra scalar value
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A chunk of text plus its metadata; the unit stored in and returned by
/// the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    /// Label used when citing this chunk in a prompt
    pub fn source_label(&self) -> &str {
        &self.metadata.source
    }
}

/// One persisted question/answer cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: String,
    pub collection: String,
    pub original_question: String,
    pub rephrased_query: String,
    pub retrieved_chunk_count: usize,
    pub answer: String,
}

impl LogEntry {
    pub fn new(
        collection: &str,
        original_question: &str,
        rephrased_query: &str,
        retrieved_chunk_count: usize,
        answer: &str,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            collection: collection.to_string(),
            original_question: original_question.to_string(),
            rephrased_query: rephrased_query.to_string(),
            retrieved_chunk_count,
            answer: answer.to_string(),
        }
    }
}

/// Progress report emitted after each ingestion batch is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// 1-based batch number
    pub batch: usize,
    /// Total batches for the file
    pub batches: usize,
    /// Chunks persisted so far
    pub indexed: usize,
    /// Total chunks for the file
    pub total: usize,
}

impl fmt::Display for BatchProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} chunks indexed", self.indexed, self.total)
    }
}
