//! Groq chat-completions backend (OpenAI-compatible endpoint).

use crate::wire::send_chat;
use crate::{ChatBackend, ChatMessage, CompletionOptions, LlmError};
use async_trait::async_trait;
use std::time::Duration;

/// Groq chat-completions backend.
///
/// Speaks the same wire protocol as [`crate::OpenAiBackend`] against Groq's
/// OpenAI-compatible endpoint.
pub struct GroqBackend {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GroqBackend {
    /// Default Groq API base URL
    pub const DEFAULT_BASE_URL: &'static str = "https://api.groq.com/openai/v1";

    /// Default model
    pub const DEFAULT_MODEL: &'static str = "meta-llama/llama-4-maverick-17b-128e-instruct";

    /// Default request timeout (seconds)
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

    /// Create a backend against a custom endpoint with an explicit timeout.
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
impl ChatBackend for GroqBackend {
    fn name(&self) -> &str {
        "groq"
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groq_backend_defaults() {
        let backend = GroqBackend::new("gsk-test", GroqBackend::DEFAULT_MODEL);
        assert_eq!(backend.base_url, GroqBackend::DEFAULT_BASE_URL);
        assert_eq!(backend.name(), "groq");
    }
}
