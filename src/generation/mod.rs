//! # Text Generation
//!
//! The boundary to the third-party text-generation service.
//!
//! A [`Generator`] takes a free-text prompt and returns free text. Nothing
//! about the returned text is trusted: callers run it through
//! [`extract::extract_json`] and treat every failure (transport error,
//! timeout, unparseable body) the same way.

pub mod extract;
pub mod prompt;

pub use extract::{ParseError, extract_json, extract_object};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::error::MemeError;

/// A text-generation service.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Send one prompt and return the raw response text.
    async fn complete(&self, prompt: &str) -> Result<String, MemeError>;
}

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    config: GenerationConfig,
}

impl OpenAiGenerator {
    /// Build a generator with its own HTTP client honoring the configured timeout.
    pub fn new(config: GenerationConfig) -> Result<Self, MemeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("memesmith/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| MemeError::Config(format!("HTTP client error: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn complete(&self, prompt: &str) -> Result<String, MemeError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| MemeError::Config("No generation API key configured".to_string()))?;

        let payload = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.8,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MemeError::Transport(format!("Generation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MemeError::Transport(format!(
                "Generation API error {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| MemeError::MalformedResponse(format!("Bad completion body: {}", e)))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| MemeError::MalformedResponse("No choices in completion".to_string()))
    }
}
