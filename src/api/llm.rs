// Chat completion client for ambient text generation
// Talks to any OpenAI-compatible endpoint (OpenRouter by default)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::utils::formatters::truncate;

/// Maximum characters of an endpoint error body kept in `GenerationError::Http`
pub const ERROR_BODY_LIMIT: usize = 300;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation endpoint returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("generation endpoint returned no text")]
    Empty,
    #[error("generation request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl GenerationError {
    pub fn http(status: u16, body: &str) -> Self {
        GenerationError::Http {
            status,
            body: truncate(body.trim(), ERROR_BODY_LIMIT),
        }
    }
}

/// One prompt for the generation endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Anything that can turn a prompt into text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[allow(dead_code)]
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

impl ChatCompletionResponse {
    /// First non-blank message content, if any
    pub fn text(&self) -> Option<&str> {
        self.choices
            .iter()
            .filter_map(|c| c.message.content.as_deref())
            .map(str::trim)
            .find(|t| !t.is_empty())
    }
}

/// OpenRouter (OpenAI-compatible) chat completion client
pub struct OpenRouterClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(http: reqwest::Client, url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    fn body(&self, request: &CompletionRequest) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        let res = self
            .http
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", "https://discord.com") // Required by OpenRouter
            .header("X-Title", "Ambient Bot")
            .json(&self.body(request))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let error_text = res.text().await.unwrap_or_default();
            return Err(GenerationError::http(status.as_u16(), &error_text));
        }

        let response: ChatCompletionResponse = res.json().await?;
        debug!("Completion returned {} choice(s)", response.choices.len());

        response
            .text()
            .map(str::to_string)
            .ok_or(GenerationError::Empty)
    }
}
