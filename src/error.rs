//! Custom error types for ragbox

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ragbox operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The one fatal path of a question cycle. Rephrasing failures never
    /// surface as this.
    #[error("Cloud LLM provider failed to generate a response: {0}")]
    GenerationFailed(String),

    #[error(
        "Ingestion failed for {path}: {source} ({chunks_persisted}/{total_chunks} chunks already persisted)"
    )]
    Ingest {
        path: PathBuf,
        chunks_persisted: usize,
        total_chunks: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for failures of an external capability (model, embeddings,
    /// index I/O) as opposed to local misconfiguration.
    pub fn is_capability_failure(&self) -> bool {
        matches!(
            self,
            Error::Llm(_)
                | Error::Embedding(_)
                | Error::Index(_)
                | Error::Timeout(_)
                | Error::Http(_)
                | Error::Io(_)
        )
    }
}

/// Result type alias for ragbox
pub type Result<T> = std::result::Result<T, Error>;
