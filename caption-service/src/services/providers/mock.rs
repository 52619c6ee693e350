//! Mock provider for testing.

use super::{CaptionProvider, ChatCompletion, ChatRequest, ProviderError};
use async_trait::async_trait;
use std::sync::Mutex;

enum MockReply {
    Content(Option<String>),
    Fail,
}

/// Returns a fixed reply (or a forced failure) and records every request it
/// receives.
pub struct MockCaptionProvider {
    reply: MockReply,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockCaptionProvider {
    /// Reply with `content` as the first choice.
    pub fn replying(content: impl Into<String>) -> Self {
        Self::with_reply(MockReply::Content(Some(content.into())))
    }

    /// Reply with a choice whose content is `null`.
    pub fn replying_without_content() -> Self {
        Self::with_reply(MockReply::Content(None))
    }

    /// Fail every call with a network error.
    pub fn failing() -> Self {
        Self::with_reply(MockReply::Fail)
    }

    fn with_reply(reply: MockReply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl CaptionProvider for MockCaptionProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ProviderError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match &self.reply {
            MockReply::Content(content) => Ok(ChatCompletion {
                content: content.clone(),
            }),
            MockReply::Fail => Err(ProviderError::NetworkError(
                "Mock provider forced failure".to_string(),
            )),
        }
    }
}
