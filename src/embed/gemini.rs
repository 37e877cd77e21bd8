//! Gemini embedding backend

use super::Embedder;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::gemini_backend::{Capability, GeminiBackendClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum requests accepted by one `batchEmbedContents` call
pub const MAX_EMBED_BATCH: usize = 100;

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

pub struct GeminiEmbedder {
    client: GeminiBackendClient,
    model_id: String,
}

impl GeminiEmbedder {
    pub fn new(client: GeminiBackendClient, model: &str) -> Self {
        let model_id = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };
        Self { client, model_id }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = GeminiBackendClient::from_config(config)?;
        Ok(Self::new(client, &config.embedding.model))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self
            .client
            .model_endpoint(&self.model_id, "batchEmbedContents")?;
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: &self.model_id,
                    content: Content {
                        parts: [Part { text }],
                    },
                })
                .collect(),
        };

        let response: BatchEmbedResponse = self
            .client
            .post_json(Capability::Embedding, url, &request)
            .await?;

        if response.embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} texts with {}", texts.len(), self.model_id);

        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_EMBED_BATCH) {
            all.extend(self.embed_batch(batch).await?);
        }
        Ok(all)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}
