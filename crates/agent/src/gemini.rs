//! Gemini `generateContent` client.
//!
//! One prompt in, the concatenated candidate text out. Transient failures are
//! retried with a linear backoff; everything else surfaces as an [`LlmError`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use intake_core::config::LlmConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::llm::{LlmClient, LlmError};

const API_VERSION: &str = "v1beta";
const RESPONSE_MIME_TYPE: &str = "application/json";
const ERROR_BODY_LIMIT: usize = 512;
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

pub struct GeminiClient {
    http: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    timeout_secs: u64,
    max_retries: u32,
    temperature: Option<f32>,
    retry_backoff: Duration,
}

impl GeminiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or_else(|| LlmError::Configuration("llm.api_key is not set".to_string()))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::Configuration(error.to_string()))?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            temperature: config.temperature,
            retry_backoff: RETRY_BACKOFF,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Endpoint without the key; the key travels as a query parameter.
    pub fn endpoint(&self) -> String {
        format!("{}/{API_VERSION}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn send_once(&self, body: &GenerateContentRequest) -> Result<String, LlmError> {
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.expose_secret())])
            .json(body)
            .send()
            .await
            .map_err(|error| self.classify_transport(error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body: truncate(&body) });
        }

        let parsed = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|error| LlmError::InvalidResponse(error.without_url().to_string()))?;

        let text = parsed.text();
        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }

    fn classify_transport(&self, error: reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout(self.timeout_secs)
        } else {
            LlmError::Transport(error.without_url().to_string())
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = GenerateContentRequest::new(prompt, self.temperature);
        debug!(
            event_name = "agent.llm.request",
            model = %self.model,
            prompt_chars = prompt.len(),
            "sending generateContent request"
        );
        with_retries(self.max_retries, self.retry_backoff, || self.send_once(&body)).await
    }
}

/// Runs `operation` once plus up to `max_retries` more times while the error
/// is retryable, sleeping `backoff * attempt` between attempts.
pub(crate) async fn with_retries<F, Fut>(
    max_retries: u32,
    backoff: Duration,
    mut operation: F,
) -> Result<String, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, LlmError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(text) => return Ok(text),
            Err(error) if error.is_retryable() && attempt < max_retries => {
                attempt += 1;
                warn!(
                    event_name = "agent.llm.retry",
                    attempt,
                    max_retries,
                    error = %error,
                    "retrying llm request"
                );
                tokio::time::sleep(backoff * attempt).await;
            }
            Err(error) => return Err(error),
        }
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    fn new(prompt: &str, temperature: Option<f32>) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(prompt.to_string()) }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: RESPONSE_MIME_TYPE.to_string(),
                temperature,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content.parts.iter().filter_map(|part| part.text.as_deref()).collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}
