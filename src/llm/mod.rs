//! Language model capability
//!
//! The orchestrator only needs two things from a model: a complete answer
//! for a prompt, or the same answer as an ordered stream of fragments.
//! Dropping the stream is the only cancellation mechanism.

mod gemini;
pub mod prompts;
mod sse;

pub use gemini::*;
pub use sse::SseDecoder;

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Finite, non-restartable sequence of generated text fragments
pub type TextStream = BoxStream<'static, Result<String>>;

/// Trait for text generation providers
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Produce a complete answer
    async fn generate(&self, prompt: &str, context: Option<&str>) -> Result<String>;

    /// Produce the answer incrementally
    async fn stream(&self, prompt: &str, context: Option<&str>) -> Result<TextStream>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Combine a prompt with optional context into the text sent to the model
pub fn frame_prompt(prompt: &str, context: Option<&str>) -> String {
    match context {
        Some(context) => format!("Context: {}\n\nQuestion: {}", context, prompt),
        None => prompt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_prompt() {
        assert_eq!(frame_prompt("Why?", None), "Why?");
        assert_eq!(
            frame_prompt("Why?", Some("Because.")),
            "Context: Because.\n\nQuestion: Why?"
        );
    }
}
