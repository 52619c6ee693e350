//! Chat-completion provider abstraction.
//!
//! The caption invoker talks to the model through [`CaptionProvider`], so the
//! OpenAI backend can be swapped for the mock in tests.

pub mod mock;
pub mod openai;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Response contained no choices")]
    EmptyResponse,
}

impl ProviderError {
    /// Short stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::ApiError(_) => "api_error",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::NetworkError(_) => "network_error",
            ProviderError::InvalidResponse(_) => "invalid_response",
            ProviderError::EmptyResponse => "empty_response",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instruction message; the newer name for `system`.
    Developer,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn developer(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Developer,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A chat-completion request; serializes to the OpenAI wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// First choice of a completion. `content` is `None` when the model
/// returned no text.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    pub content: Option<String>,
}

#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// Run one completion. Implementations must not retry.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ProviderError>;
}
