//! Generation capability — the opaque text-completion collaborator.
//!
//! The orchestrator only needs "given a conversation, produce a text
//! completion". [`GenerationBackend`] is that seam; [`OpenAiBackend`]
//! is the production implementation against an OpenAI-compatible
//! chat-completions endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors from the generation capability.
///
/// Any of these is fatal to the debate that triggered the call — the
/// protocol specifies no automatic retry.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("response parse error: {0}")]
    ParseError(String),

    #[error("completion was empty")]
    EmptyCompletion,

    #[error("API key not configured")]
    MissingApiKey,
}

/// Sender role of a conversation turn, in chat-completions terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// A completion request: full conversation plus sampling parameters.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f32,
    /// Nucleus sampling cutoff. Zero means "unset" and is omitted from
    /// the wire request.
    pub top_p: f32,
    pub messages: Vec<ChatTurn>,
}

/// The text-generation capability, treated as fallible and possibly slow.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError>;
}

/// OpenAI-compatible chat-completions backend.
pub struct OpenAiBackend {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiBackend {
    /// Create a backend against the public OpenAI endpoint.
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com/v1")
    }

    /// Create a backend against any OpenAI-compatible endpoint
    /// (local inference servers, proxies).
    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
        });
        if request.top_p > 0.0 {
            body["top_p"] = serde_json::json!(request.top_p);
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::RequestFailed(format!(
                "chat completions error ({}): {}",
                status, body
            )));
        }

        let resp_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerationError::ParseError(e.to_string()))?;

        let content = resp_json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        if content.is_empty() {
            return Err(GenerationError::EmptyCompletion);
        }

        Ok(content)
    }
}
