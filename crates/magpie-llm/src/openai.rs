//! OpenAI chat-completions backend.

use crate::wire::send_chat;
use crate::{ChatBackend, ChatMessage, CompletionOptions, LlmError};
use async_trait::async_trait;
use std::time::Duration;

/// OpenAI chat-completions backend.
pub struct OpenAiBackend {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiBackend {
    /// Default OpenAI API base URL
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    /// Default model
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    /// Default request timeout (seconds). Completion calls are slow,
    /// potentially multi-second operations; callers should not wait forever.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Create a backend with the default base URL and timeout.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(
            Self::DEFAULT_BASE_URL,
            api_key,
            model,
            Self::DEFAULT_TIMEOUT_SECS,
        )
    }

    /// Create a backend against a custom endpoint (proxies, test servers)
    /// with an explicit request timeout.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap();

        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        send_chat(
            &self.client,
            &self.base_url,
            &self.api_key,
            &self.model,
            messages,
            options,
        )
        .await
    }
}
