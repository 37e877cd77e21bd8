//! Configuration management for ragbox
//!
//! Settings come from three layers, later ones winning:
//! - built-in defaults (see `defaults.rs`)
//! - an optional TOML file
//! - environment variables (a `.env` file in the working directory is read first)
//!
//! The merged result is validated once at startup; any failure is fatal.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Language model configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Ingestion pacing and filtering
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Conversation configuration
    #[serde(default)]
    pub chat: ChatConfig,

    /// Storage locations
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Generation model identifier
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Environment variable name for the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Maximum tokens per generated answer
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Retries after a failed request (0 disables retrying)
    #[serde(default = "default_llm_max_retries")]
    pub max_retries: usize,

    /// Resolved API key, never written back to disk
    #[serde(skip)]
    pub api_key: Option<String>,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum bytes per chunk (cut on UTF-8 boundaries)
    #[serde(default = "default_chunk_size")]
    pub size: usize,

    /// Overlap bytes between chunks
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Chunks written per index append
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches, in milliseconds
    #[serde(default = "default_ingest_delay_ms")]
    pub delay_ms: u64,

    /// The only file extension accepted (without the dot)
    #[serde(default = "default_ingest_extension")]
    pub extension: String,
}

/// Conversation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Chunks retrieved per question
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Maximum remembered turns (user and assistant turns counted separately)
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Print answers fragment by fragment
    #[serde(default)]
    pub stream: bool,

    /// Answer returned when nothing relevant is retrieved
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
}

/// Storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the per-collection vector indexes
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Root of the raw per-collection documents
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory for the daily interaction logs
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            base_url: default_llm_base_url(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_llm_timeout(),
            max_retries: default_llm_max_retries(),
            api_key: None,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: default_chunk_size(),
            overlap: default_chunk_overlap(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            delay_ms: default_ingest_delay_ms(),
            extension: default_ingest_extension(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            search_limit: default_search_limit(),
            max_history: default_max_history(),
            stream: false,
            fallback_message: default_fallback_message(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            data_dir: default_data_dir(),
            log_dir: default_log_dir(),
        }
    }
}

impl Config {
    /// Load configuration for the running process: optional TOML file,
    /// then `.env`, then the process environment, then validation.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };

        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {:?}", path),
            Err(e) if e.not_found() => debug!("No .env file found"),
            Err(e) => return Err(Error::Config(format!("Invalid .env file: {}", e))),
        }

        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);

        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Overlay environment values using the given lookup.
    ///
    /// Variable names follow the classic `.env` layout (`GEMINI_MODEL`,
    /// `CHUNK_SIZE`, ...). The API key is read from the variable named by
    /// `llm.api_key_env`.
    pub fn apply_env_with<F>(&mut self, get: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = get(&self.llm.api_key_env) {
            self.llm.api_key = Some(key);
        }

        if let Some(v) = get("GEMINI_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("GEMINI_BASE_URL") {
            self.llm.base_url = v;
        }
        override_parsed(&get, "GEMINI_MAX_TOKENS", &mut self.llm.max_output_tokens)?;
        override_parsed(&get, "LLM_TIMEOUT_SECS", &mut self.llm.timeout_secs)?;
        override_parsed(&get, "LLM_MAX_RETRIES", &mut self.llm.max_retries)?;

        if let Some(v) = get("EMBEDDING_MODEL") {
            self.embedding.model = v;
        }

        override_parsed(&get, "CHUNK_SIZE", &mut self.chunk.size)?;
        override_parsed(&get, "CHUNK_OVERLAP", &mut self.chunk.overlap)?;

        override_parsed(&get, "BATCH_SIZE", &mut self.ingest.batch_size)?;
        override_parsed(&get, "INGEST_DELAY", &mut self.ingest.delay_ms)?;
        if let Some(v) = get("INGEST_EXTENSION") {
            self.ingest.extension = v;
        }

        override_parsed(&get, "VECTOR_SEARCH_LIMIT", &mut self.chat.search_limit)?;
        override_parsed(&get, "MAX_CHAT_HISTORY", &mut self.chat.max_history)?;
        override_parsed(&get, "CHAT_STREAM", &mut self.chat.stream)?;

        if let Some(v) = get("STORAGE_PATH") {
            self.paths.storage_dir = PathBuf::from(v);
        }
        if let Some(v) = get("DATA_PATH") {
            self.paths.data_dir = PathBuf::from(v);
        }
        if let Some(v) = get("LOG_PATH") {
            self.paths.log_dir = PathBuf::from(v);
        }

        Ok(())
    }

    /// The resolved API key
    pub fn api_key(&self) -> Result<&str> {
        self.llm
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "The {} environment variable is required",
                    self.llm.api_key_env
                ))
            })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.api_key()?;

        if self.chunk.size == 0 {
            return Err(Error::Config("chunk.size must be positive".to_string()));
        }

        if self.chunk.overlap >= self.chunk.size {
            return Err(Error::Config(
                "chunk.overlap must be < chunk.size".to_string(),
            ));
        }

        if self.ingest.batch_size == 0 {
            return Err(Error::Config(
                "ingest.batch_size must be positive".to_string(),
            ));
        }

        let extension = self.ingest.extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(Error::Config(
                "ingest.extension must not be empty".to_string(),
            ));
        }

        if self.chat.search_limit == 0 {
            return Err(Error::Config(
                "chat.search_limit must be positive".to_string(),
            ));
        }

        if self.chat.max_history < 2 || self.chat.max_history % 2 != 0 {
            return Err(Error::Config(
                "chat.max_history must be an even number >= 2".to_string(),
            ));
        }

        if self.llm.timeout_secs == 0 {
            return Err(Error::Config(
                "llm.timeout_secs must be positive".to_string(),
            ));
        }

        url::Url::parse(&self.llm.base_url)
            .map_err(|e| Error::Config(format!("Invalid llm.base_url: {}", e)))?;

        Ok(())
    }
}

fn override_parsed<F, T>(get: &F, key: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = get(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{} has invalid value '{}': {}", key, raw, e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn with_key() -> Config {
        let mut config = Config::default();
        config.llm.api_key = Some("test-key".to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.model, "gemini-2.5-flash-lite");
        assert_eq!(config.chunk.size, 2500);
        assert_eq!(config.chunk.overlap, 500);
        assert_eq!(config.chat.max_history, 6);
        assert_eq!(config.paths.storage_dir, PathBuf::from("storage/vectors"));
        assert!(with_key().validate().is_ok());
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("GOOGLE_API_KEY")));
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("GOOGLE_API_KEY", "abc"),
            ("GEMINI_MODEL", "gemini-pro"),
            ("CHUNK_SIZE", "800"),
            ("CHUNK_OVERLAP", "80"),
            ("BATCH_SIZE", "10"),
            ("INGEST_DELAY", "0"),
            ("MAX_CHAT_HISTORY", "4"),
            ("CHAT_STREAM", "true"),
            ("STORAGE_PATH", "/tmp/vec"),
        ]);

        let mut config = Config::default();
        config
            .apply_env_with(|k| vars.get(k).cloned())
            .unwrap();

        assert_eq!(config.api_key().unwrap(), "abc");
        assert_eq!(config.llm.model, "gemini-pro");
        assert_eq!(config.chunk.size, 800);
        assert_eq!(config.chunk.overlap, 80);
        assert_eq!(config.ingest.batch_size, 10);
        assert_eq!(config.ingest.delay_ms, 0);
        assert_eq!(config.chat.max_history, 4);
        assert!(config.chat.stream);
        assert_eq!(config.paths.storage_dir, PathBuf::from("/tmp/vec"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_custom_api_key_env() {
        let vars = env(&[("MY_KEY", "secret")]);
        let mut config = Config::default();
        config.llm.api_key_env = "MY_KEY".to_string();
        config
            .apply_env_with(|k| vars.get(k).cloned())
            .unwrap();
        assert_eq!(config.api_key().unwrap(), "secret");
    }

    #[test]
    fn test_malformed_number_is_config_error() {
        let vars = env(&[("CHUNK_SIZE", "lots")]);
        let mut config = Config::default();
        let err = config
            .apply_env_with(|k| vars.get(k).cloned())
            .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("CHUNK_SIZE")));
    }

    #[test]
    fn test_config_validation() {
        let mut config = with_key();

        // Invalid: overlap >= size
        config.chunk.overlap = config.chunk.size;
        assert!(config.validate().is_err());
        config.chunk.overlap = 100;
        assert!(config.validate().is_ok());

        // Invalid: odd history
        config.chat.max_history = 5;
        assert!(config.validate().is_err());
        config.chat.max_history = 0;
        assert!(config.validate().is_err());
        config.chat.max_history = 2;
        assert!(config.validate().is_ok());

        config.ingest.batch_size = 0;
        assert!(config.validate().is_err());
        config.ingest.batch_size = 1;

        config.chat.search_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_toml_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ragbox.toml");
        std::fs::write(
            &path,
            r#"
[chunk]
size = 1000
overlap = 100

[chat]
search_limit = 3
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.chunk.size, 1000);
        assert_eq!(config.chat.search_limit, 3);
        // untouched sections keep defaults
        assert_eq!(config.ingest.batch_size, 100);
        assert_eq!(config.chat.max_history, 6);
    }

    #[test]
    fn test_missing_config_file() {
        let err = Config::from_file(Path::new("/nonexistent/ragbox.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
