//! HTTP transport shared by the Gemini embedder and language model.
//!
//! Every request carries the API key header, a per-request timeout and a
//! bounded retry loop with linear backoff. Client errors other than 429
//! are returned immediately.

use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const API_KEY_HEADER: &str = "x-goog-api-key";
const RETRY_BACKOFF_MS: u64 = 500;

/// Which capability a request belongs to; decides the error variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Generation,
    Embedding,
}

impl Capability {
    fn error(self, message: String) -> Error {
        match self {
            Capability::Generation => Error::Llm(message),
            Capability::Embedding => Error::Embedding(message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

pub struct GeminiBackendClient {
    client: Client,
    base_url: Url,
    api_key: String,
    retries: usize,
    timeout: Duration,
}

impl GeminiBackendClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration, retries: usize) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            retries,
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.llm.base_url,
            config.api_key()?,
            Duration::from_secs(config.llm.timeout_secs),
            config.llm.max_retries,
        )
    }

    /// Build the URL for a model method, e.g. `models/gemini:generateContent`
    pub fn model_endpoint(&self, model: &str, method: &str) -> Result<Url> {
        let model = model.trim_start_matches("models/");
        self.base_url
            .join(&format!("/v1beta/models/{}:{}", model, method))
            .map_err(|e| Error::Config(format!("Invalid Gemini base URL: {}", e)))
    }

    /// POST a JSON body and decode a JSON response
    pub async fn post_json<B, T>(&self, capability: Capability, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(url).json(body);
        let response = self.send_with_retry(capability, request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| capability.error(format!("Malformed response: {}", e)))
    }

    /// POST a JSON body and hand back the raw response for streaming
    pub async fn post_streaming<B>(&self, capability: Capability, url: Url, body: &B) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let request = self.client.post(url).json(body);
        self.send_with_retry(capability, request).await
    }

    async fn send_with_retry(&self, capability: Capability, request: RequestBuilder) -> Result<Response> {
        let request = request.header(API_KEY_HEADER, &self.api_key);
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.retries {
            let req = request
                .try_clone()
                .ok_or_else(|| capability.error("Failed to clone backend request".to_string()))?;

            match req.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let message = read_error_message(response).await;
                    let err = capability.error(format!("{}: {}", status, message));
                    if !is_retryable(status) {
                        return Err(err);
                    }
                    last_err = Some(err);
                }
                Err(e) if e.is_timeout() => {
                    last_err = Some(Error::Timeout(format!(
                        "no response within {:?}",
                        self.timeout
                    )));
                }
                Err(e) => last_err = Some(capability.error(e.to_string())),
            }

            if attempt < self.retries {
                let delay = Duration::from_millis(RETRY_BACKOFF_MS * (attempt as u64 + 1));
                warn!(
                    "Backend request failed (attempt {}/{}), retrying in {:?}",
                    attempt + 1,
                    self.retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_err.unwrap_or_else(|| capability.error("Backend request failed".to_string())))
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

async fn read_error_message(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiErrorBody>(&text) {
        Ok(body) if !body.error.message.is_empty() => body.error.message,
        _ => {
            debug!("Unstructured error body: {}", text);
            text
        }
    }
}
