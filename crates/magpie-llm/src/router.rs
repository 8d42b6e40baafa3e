//! Backend selection and single-step fallback.

use crate::{ChatBackend, ChatMessage, CompletionOptions, LlmError};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// How the router picks a backend for each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingPolicy {
    /// Prefer the primary backend; after its first failure route subsequent
    /// calls straight to the fallback
    #[default]
    Auto,
    /// Always try the primary first, falling back within the call on failure
    Primary,
    /// Route to the fallback backend only
    Fallback,
}

/// Routes chat completions to a primary backend with one fallback.
///
/// A call never retries the same backend: the candidate list is tried in
/// order and the first success wins. Under [`RoutingPolicy::Auto`] a primary
/// failure demotes it for the lifetime of the router, so later calls skip
/// straight to the fallback.
pub struct ProviderRouter {
    primary: Option<Arc<dyn ChatBackend>>,
    fallback: Option<Arc<dyn ChatBackend>>,
    policy: RoutingPolicy,
    current: RwLock<Option<String>>,
}

impl ProviderRouter {
    /// Create a router over the configured backends.
    pub fn new(
        primary: Option<Arc<dyn ChatBackend>>,
        fallback: Option<Arc<dyn ChatBackend>>,
        policy: RoutingPolicy,
    ) -> Self {
        let initial = match policy {
            RoutingPolicy::Fallback => fallback
                .as_ref()
                .or(primary.as_ref())
                .map(|b| b.name().to_string()),
            _ => primary
                .as_ref()
                .or(fallback.as_ref())
                .map(|b| b.name().to_string()),
        };

        Self {
            primary,
            fallback,
            policy,
            current: RwLock::new(initial),
        }
    }

    /// Name of the backend that served the most recent call, or "none" when
    /// no backend is configured.
    pub fn current_provider(&self) -> String {
        self.current
            .read()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "none".to_string())
    }

    /// True if at least one backend is configured.
    pub fn is_configured(&self) -> bool {
        self.primary.is_some() || self.fallback.is_some()
    }

    fn candidates(&self) -> Vec<Arc<dyn ChatBackend>> {
        match self.policy {
            RoutingPolicy::Fallback => self.fallback.iter().cloned().collect(),
            RoutingPolicy::Primary => self
                .primary
                .iter()
                .chain(self.fallback.iter())
                .cloned()
                .collect(),
            RoutingPolicy::Auto => {
                // A demoted primary stays demoted for the router's lifetime
                let demoted = match (&self.primary, &self.fallback) {
                    (Some(primary), Some(fallback)) => {
                        let current = self.current.read().unwrap();
                        current.as_deref() == Some(fallback.name())
                            && fallback.name() != primary.name()
                    }
                    _ => false,
                };

                if demoted {
                    self.fallback.iter().cloned().collect()
                } else {
                    self.primary
                        .iter()
                        .chain(self.fallback.iter())
                        .cloned()
                        .collect()
                }
            }
        }
    }

    /// Generate one completion, trying each candidate backend in order.
    ///
    /// Returns the last backend's error when all candidates fail, or
    /// [`LlmError::NoProviderAvailable`] when none are configured.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let candidates = self.candidates();
        if candidates.is_empty() {
            return Err(LlmError::NoProviderAvailable);
        }

        let mut last_error = None;
        for backend in candidates {
            debug!(provider = backend.name(), "issuing chat completion");
            match backend.complete(messages, options).await {
                Ok(content) => {
                    *self.current.write().unwrap() = Some(backend.name().to_string());
                    return Ok(content);
                }
                Err(e) => {
                    warn!(provider = backend.name(), error = %e, "backend failed, trying next");
                    *self.current.write().unwrap() = Some(backend.name().to_string());
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(LlmError::NoProviderAvailable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockBackend;

    fn arc(backend: MockBackend) -> Arc<dyn ChatBackend> {
        Arc::new(backend)
    }

    #[tokio::test]
    async fn test_no_backends_configured() {
        let router = ProviderRouter::new(None, None, RoutingPolicy::Auto);
        assert!(!router.is_configured());
        assert_eq!(router.current_provider(), "none");

        let result = router.complete(&[], &CompletionOptions::default()).await;
        assert!(matches!(result, Err(LlmError::NoProviderAvailable)));
    }

    #[tokio::test]
    async fn test_primary_serves_when_healthy() {
        let primary = MockBackend::new("openai", "from primary");
        let fallback = MockBackend::new("groq", "from fallback");
        let router = ProviderRouter::new(
            Some(arc(primary.clone())),
            Some(arc(fallback.clone())),
            RoutingPolicy::Auto,
        );

        let answer = router
            .complete(&[ChatMessage::user("hi")], &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(answer, "from primary");
        assert_eq!(router.current_provider(), "openai");
        assert_eq!(fallback.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fallback_on_primary_failure() {
        let primary = MockBackend::failing("openai", "quota exhausted");
        let fallback = MockBackend::new("groq", "from fallback");
        let router = ProviderRouter::new(
            Some(arc(primary.clone())),
            Some(arc(fallback.clone())),
            RoutingPolicy::Auto,
        );

        let answer = router
            .complete(&[ChatMessage::user("hi")], &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(answer, "from fallback");
        assert_eq!(router.current_provider(), "groq");
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_auto_demotion_skips_primary_on_later_calls() {
        let primary = MockBackend::failing("openai", "down");
        let fallback = MockBackend::new("groq", "ok");
        let router = ProviderRouter::new(
            Some(arc(primary.clone())),
            Some(arc(fallback.clone())),
            RoutingPolicy::Auto,
        );

        let options = CompletionOptions::default();
        router.complete(&[], &options).await.unwrap();
        router.complete(&[], &options).await.unwrap();
        router.complete(&[], &options).await.unwrap();

        // Primary was only hit on the first call
        assert_eq!(primary.call_count(), 1);
        assert_eq!(fallback.call_count(), 3);
    }

    #[tokio::test]
    async fn test_primary_policy_retries_primary_each_call() {
        let primary = MockBackend::failing("openai", "down");
        let fallback = MockBackend::new("groq", "ok");
        let router = ProviderRouter::new(
            Some(arc(primary.clone())),
            Some(arc(fallback.clone())),
            RoutingPolicy::Primary,
        );

        let options = CompletionOptions::default();
        router.complete(&[], &options).await.unwrap();
        router.complete(&[], &options).await.unwrap();

        assert_eq!(primary.call_count(), 2);
        assert_eq!(fallback.call_count(), 2);
    }

    #[tokio::test]
    async fn test_fallback_policy_never_touches_primary() {
        let primary = MockBackend::new("openai", "from primary");
        let fallback = MockBackend::new("groq", "from fallback");
        let router = ProviderRouter::new(
            Some(arc(primary.clone())),
            Some(arc(fallback.clone())),
            RoutingPolicy::Fallback,
        );

        let answer = router
            .complete(&[], &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(answer, "from fallback");
        assert_eq!(primary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_all_backends_fail_returns_last_error() {
        let primary = MockBackend::failing("openai", "first");
        let fallback = MockBackend::failing("groq", "second");
        let router = ProviderRouter::new(
            Some(arc(primary)),
            Some(arc(fallback)),
            RoutingPolicy::Auto,
        );

        let result = router.complete(&[], &CompletionOptions::default()).await;
        match result {
            Err(LlmError::Communication(message)) => assert_eq!(message, "second"),
            other => panic!("unexpected result: {:?}", other.map_err(|e| e.to_string())),
        }
    }

    #[tokio::test]
    async fn test_single_backend_serves_all_policies() {
        for policy in [RoutingPolicy::Auto, RoutingPolicy::Primary] {
            let only = MockBackend::new("groq", "solo");
            let router = ProviderRouter::new(Some(arc(only.clone())), None, policy);
            let answer = router
                .complete(&[], &CompletionOptions::default())
                .await
                .unwrap();
            assert_eq!(answer, "solo");
        }
    }

    #[test]
    fn test_initial_provider_is_first_configured() {
        let fallback = MockBackend::new("groq", "x");
        let router = ProviderRouter::new(None, Some(arc(fallback)), RoutingPolicy::Auto);
        assert_eq!(router.current_provider(), "groq");
    }
}
