//! Magpie LLM Provider Layer
//!
//! Chat-completion backends behind a common [`ChatBackend`] trait, plus the
//! [`ProviderRouter`] that picks a backend per call and falls back once on
//! failure.
//!
//! # Backends
//!
//! - [`OpenAiBackend`]: OpenAI chat completions
//! - [`GroqBackend`]: Groq's OpenAI-compatible endpoint
//! - [`MockBackend`]: deterministic mock for testing
//!
//! # Examples
//!
//! ```
//! use magpie_llm::{ChatMessage, CompletionOptions, MockBackend, ProviderRouter, RoutingPolicy};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let backend = Arc::new(MockBackend::new("mock", "Hello from LLM!"));
//! let router = ProviderRouter::new(Some(backend), None, RoutingPolicy::Auto);
//!
//! let answer = router
//!     .complete(&[ChatMessage::user("hi")], &CompletionOptions::default())
//!     .await
//!     .unwrap();
//! assert_eq!(answer, "Hello from LLM!");
//! # });
//! ```

#![warn(missing_docs)]

mod groq;
mod openai;
mod router;
mod wire;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use groq::GroqBackend;
pub use openai::OpenAiBackend;
pub use router::{ProviderRouter, RoutingPolicy};

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Neither generation backend is configured
    #[error("No generation backend configured")]
    NoProviderAvailable,

    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Authentication or authorization failure
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Rate limit or quota exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Invalid response from the backend
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// Message role in a chat completion request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// User content
    User,
}

/// One role-tagged message in a chat completion request
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Message role
    pub role: Role,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Build a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Build a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Per-call generation parameters
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Sampling temperature
    pub temperature: f32,
    /// Output token budget
    pub max_tokens: u32,
    /// Request a streamed response; deltas are accumulated into one string
    /// before returning, callers never observe partial chunks
    pub stream: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 2000,
            stream: false,
        }
    }
}

/// A chat-completion backend.
///
/// Implementations are expected to be slow (seconds per call) and may fail
/// on auth or quota errors; the [`ProviderRouter`] handles fallback.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Stable provider name for observability and citations
    fn name(&self) -> &str;

    /// Generate one completion for the given messages.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;
}

/// Mock backend for deterministic testing.
///
/// Returns a fixed response (or a forced failure) without network calls and
/// counts invocations so tests can assert that an operation issued zero or
/// one generation call.
#[derive(Clone)]
pub struct MockBackend {
    name: String,
    response: String,
    fail_with: Option<String>,
    call_count: Arc<Mutex<usize>>,
}

impl MockBackend {
    /// Create a backend that always succeeds with `response`.
    pub fn new(name: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response: response.into(),
            fail_with: None,
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Create a backend that always fails with the given message.
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response: String::new(),
            fail_with: Some(message.into()),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of times `complete` was invoked.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        *self.call_count.lock().unwrap() += 1;

        match &self.fail_with {
            Some(message) => Err(LlmError::Communication(message.clone())),
            None => Ok(self.response.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend_response() {
        let backend = MockBackend::new("mock", "Test response");
        let result = backend
            .complete(&[ChatMessage::user("any")], &CompletionOptions::default())
            .await;
        assert_eq!(result.unwrap(), "Test response");
    }

    #[tokio::test]
    async fn test_mock_backend_call_count() {
        let backend = MockBackend::new("mock", "x");
        assert_eq!(backend.call_count(), 0);

        let options = CompletionOptions::default();
        backend.complete(&[], &options).await.unwrap();
        backend.complete(&[], &options).await.unwrap();
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_backend_failure() {
        let backend = MockBackend::failing("mock", "boom");
        let result = backend.complete(&[], &CompletionOptions::default()).await;
        assert!(matches!(result, Err(LlmError::Communication(_))));
        assert_eq!(backend.call_count(), 1);
    }

    #[test]
    fn test_mock_backend_clone_shares_count() {
        let a = MockBackend::new("mock", "x");
        let b = a.clone();
        *a.call_count.lock().unwrap() += 1;
        assert_eq!(b.call_count(), 1);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let message = ChatMessage::system("be brief");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "be brief");
    }
}
