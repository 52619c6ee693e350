//! Caption generation: body -> prompt -> one completion call -> [`Caption`].

use crate::models::{Caption, CaptionRequest, PromptPayload, RequestBodyError};
use crate::services::providers::{CaptionProvider, ChatMessage, ChatRequest, ProviderError};
use axum::{
    extract::rejection::BytesRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics::{counter, histogram};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Instruction message sent ahead of the expression scores.
pub const CAPTION_INSTRUCTIONS: &str = "You are an emotion caption generator. \
Identify the expression with the highest probability. \
Generate a short, fun, witty Korean sentence (max 20 chars). \
Do not mention probabilities.";

/// Body returned for every failed generation, whatever the cause.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to process request";

const JSON_UTF8: &str = "application/json; charset=utf-8";

#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("Failed to read request body: {0}")]
    ReadBody(#[from] BytesRejection),

    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] RequestBodyError),

    #[error("Failed to build prompt: {0}")]
    Prompt(serde_json::Error),

    #[error("Completion provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Failed to serialize caption: {0}")]
    Serialize(serde_json::Error),
}

impl CaptionError {
    fn outcome(&self) -> &'static str {
        match self {
            CaptionError::ReadBody(_) => "read_body_error",
            CaptionError::InvalidBody(_) => "invalid_body",
            CaptionError::Prompt(_) => "prompt_error",
            CaptionError::Provider(e) => e.kind(),
            CaptionError::Serialize(_) => "serialize_error",
        }
    }
}

impl IntoResponse for CaptionError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Error processing caption request");

        let mut res = (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": GENERIC_FAILURE_MESSAGE })),
        )
            .into_response();

        res.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        res
    }
}

impl IntoResponse for Caption {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self) {
            Ok(body) => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, JSON_UTF8),
                    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
                ],
                body,
            )
                .into_response(),
            Err(e) => CaptionError::Serialize(e).into_response(),
        }
    }
}

fn record_outcome(outcome: &'static str) {
    counter!("caption_requests_total", "outcome" => outcome).increment(1);
}

/// Turns a request body into exactly one completion call.
#[derive(Clone)]
pub struct CaptionInvoker {
    provider: Arc<dyn CaptionProvider>,
    model: String,
}

impl CaptionInvoker {
    pub fn new(provider: Arc<dyn CaptionProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Developer instructions followed by `{"expressions": ...}` as the user turn.
    pub fn build_prompt(&self, request: &CaptionRequest) -> Result<ChatRequest, CaptionError> {
        let payload = serde_json::to_string(&PromptPayload {
            expressions: &request.expressions,
        })
        .map_err(CaptionError::Prompt)?;

        Ok(ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::developer(CAPTION_INSTRUCTIONS),
                ChatMessage::user(payload),
            ],
        })
    }

    /// Parse `body`, call the provider once, and return the first choice.
    pub async fn generate(&self, body: &[u8]) -> Result<Caption, CaptionError> {
        let result = self.try_generate(body).await;

        record_outcome(match &result {
            Ok(_) => "success",
            Err(e) => e.outcome(),
        });

        result
    }

    /// Count a failure raised before the body reached [`Self::generate`].
    pub fn reject(&self, err: CaptionError) -> CaptionError {
        record_outcome(err.outcome());
        err
    }

    async fn try_generate(&self, body: &[u8]) -> Result<Caption, CaptionError> {
        let request = CaptionRequest::from_body(body)?;
        let prompt = self.build_prompt(&request)?;

        tracing::debug!(
            expression_count = request.expressions.len(),
            dominant = ?request.expressions.dominant().map(|(label, _)| label),
            model = %self.model,
            "Requesting caption"
        );

        let start = Instant::now();
        let completion = self.provider.complete(&prompt).await;
        histogram!("caption_provider_latency_seconds").record(start.elapsed().as_secs_f64());

        Ok(Caption {
            phrase: completion?.content,
        })
    }
}
