//! Gemini text generation backend

use super::{frame_prompt, LanguageModel, SseDecoder, TextStream};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::gemini_backend::{Capability, GeminiBackendClient};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn empty_reason(&self) -> String {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return format!("prompt blocked ({})", reason);
        }
        match self.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
            Some(reason) => format!("empty response (finish reason {})", reason),
            None => "empty response".to_string(),
        }
    }
}

/// Google Gemini client implementing [`LanguageModel`]
pub struct GeminiClient {
    client: GeminiBackendClient,
    model: String,
    max_output_tokens: u32,
}

impl GeminiClient {
    pub fn new(client: GeminiBackendClient, model: &str, max_output_tokens: u32) -> Self {
        Self {
            client,
            model: model.to_string(),
            max_output_tokens,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = GeminiBackendClient::from_config(config)?;
        Ok(Self::new(client, &config.llm.model, config.llm.max_output_tokens))
    }

    fn request<'a>(&self, text: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: [RequestContent {
                role: "user",
                parts: [RequestPart { text }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str, context: Option<&str>) -> Result<String> {
        let text = frame_prompt(prompt, context);
        let url = self.client.model_endpoint(&self.model, "generateContent")?;

        debug!("Generating with {} ({} prompt bytes)", self.model, text.len());
        let response: GenerateResponse = self
            .client
            .post_json(Capability::Generation, url, &self.request(&text))
            .await?;

        let answer = response.text();
        if answer.trim().is_empty() {
            return Err(Error::Llm(response.empty_reason()));
        }
        Ok(answer)
    }

    async fn stream(&self, prompt: &str, context: Option<&str>) -> Result<TextStream> {
        let text = frame_prompt(prompt, context);
        let mut url = self
            .client
            .model_endpoint(&self.model, "streamGenerateContent")?;
        url.set_query(Some("alt=sse"));

        debug!("Streaming with {} ({} prompt bytes)", self.model, text.len());
        let response = self
            .client
            .post_streaming(Capability::Generation, url, &self.request(&text))
            .await?;

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();

        Ok(fragments(body))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

struct StreamState {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

/// Turn an SSE body into text fragments, ending after the first error
fn fragments(body: BoxStream<'static, reqwest::Result<Vec<u8>>>) -> TextStream {
    let state = StreamState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.pending.pop_front() {
                match serde_json::from_str::<GenerateResponse>(&payload) {
                    Ok(event) => {
                        let text = event.text();
                        if text.is_empty() {
                            continue;
                        }
                        return Some((Ok(text), state));
                    }
                    Err(e) => {
                        state.pending.clear();
                        state.finished = true;
                        return Some((
                            Err(Error::Llm(format!("Malformed stream event: {}", e))),
                            state,
                        ));
                    }
                }
            }

            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let payloads = state.decoder.push(&bytes);
                    state.pending.extend(payloads);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    let err = if e.is_timeout() {
                        Error::Timeout("stream stalled".to_string())
                    } else {
                        Error::Llm(e.to_string())
                    };
                    return Some((Err(err), state));
                }
                None => {
                    state.finished = true;
                    let payloads = state.decoder.finish();
                    state.pending.extend(payloads);
                }
            }
        }
    })
    .boxed()
}
