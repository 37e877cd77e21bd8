//! Default values for configuration

use std::path::PathBuf;

/// Default environment variable holding the Google API key
pub fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

/// Default generation model
pub fn default_llm_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

/// Default Gemini API endpoint
pub fn default_llm_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

/// Default cap on generated tokens
pub fn default_max_output_tokens() -> u32 {
    2048
}

/// Default request timeout in seconds
pub fn default_llm_timeout() -> u64 {
    60
}

/// Default number of retries after a failed model request
pub fn default_llm_max_retries() -> usize {
    2
}

/// Default embedding model
pub fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

/// Default maximum characters per chunk
pub fn default_chunk_size() -> usize {
    2500
}

/// Default overlap characters between chunks
pub fn default_chunk_overlap() -> usize {
    500
}

/// Default number of chunks per index write
pub fn default_batch_size() -> usize {
    100
}

/// Default pause between batch writes (milliseconds)
pub fn default_ingest_delay_ms() -> u64 {
    1000
}

/// Default accepted file extension
pub fn default_ingest_extension() -> String {
    "txt".to_string()
}

/// Default number of chunks retrieved per question
pub fn default_search_limit() -> usize {
    5
}

/// Default chat history length (turns, always even)
pub fn default_max_history() -> usize {
    6
}

/// Default answer when retrieval comes back empty
pub fn default_fallback_message() -> String {
    "I couldn't find relevant information in the current collection.".to_string()
}

/// Default vector storage root
pub fn default_storage_dir() -> PathBuf {
    PathBuf::from("storage/vectors")
}

/// Default raw data root
pub fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Default interaction log directory
pub fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}
