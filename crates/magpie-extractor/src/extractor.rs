//! LLM-driven attribute extraction

use crate::config::ExtractorConfig;
use crate::parser::parse_llm_response;
use crate::prompt::PromptBuilder;
use magpie_domain::{Attributes, RecordType};
use magpie_llm::{CompletionOptions, ProviderRouter};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Converts page text into structured attributes for a record type.
///
/// Extraction never fails: any error on the LLM or parsing path degrades to
/// a typed error envelope so callers always get an attribute map carrying
/// `type` and `vocabulary`.
pub struct Extractor {
    router: Arc<ProviderRouter>,
    config: ExtractorConfig,
}

impl Extractor {
    /// Create an extractor over the given provider router.
    pub fn new(router: Arc<ProviderRouter>, config: ExtractorConfig) -> Self {
        Self { router, config }
    }

    /// Extract structured attributes from page text.
    ///
    /// Issues exactly one completion call. The returned map always carries
    /// `type` (the record type name) and `vocabulary`; on failure it carries
    /// an `error` key instead of extracted data.
    pub async fn extract(&self, text: &str, record_type: RecordType) -> Attributes {
        let messages =
            PromptBuilder::new(text, record_type, self.config.max_excerpt_chars).build();
        let options = CompletionOptions {
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        let response = match self.router.complete(&messages, &options).await {
            Ok(response) => response,
            Err(e) => {
                warn!(record_type = %record_type, error = %e, "extraction backend failed");
                return error_envelope(record_type, &e.to_string());
            }
        };

        match parse_llm_response(&response) {
            Ok(mut attributes) => {
                debug!(record_type = %record_type, fields = attributes.len(), "extracted attributes");
                stamp(&mut attributes, record_type);
                attributes
            }
            Err(e) => {
                warn!(record_type = %record_type, error = %e, "extraction response unparseable");
                error_envelope(record_type, "parse failure")
            }
        }
    }
}

/// Overwrite the envelope tags so downstream consumers can rely on them
/// regardless of what the backend produced.
fn stamp(attributes: &mut Attributes, record_type: RecordType) {
    attributes.insert(
        "type".to_string(),
        Value::String(record_type.as_str().to_string()),
    );
    attributes.insert(
        "vocabulary".to_string(),
        Value::String(crate::normalize::VOCABULARY.to_string()),
    );
}

fn error_envelope(record_type: RecordType, message: &str) -> Attributes {
    let mut attributes = Attributes::new();
    stamp(&mut attributes, record_type);
    attributes.insert("error".to_string(), Value::String(message.to_string()));
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use magpie_llm::{MockBackend, RoutingPolicy};

    fn extractor_with(backend: MockBackend) -> Extractor {
        let router = Arc::new(ProviderRouter::new(
            Some(Arc::new(backend)),
            None,
            RoutingPolicy::Auto,
        ));
        Extractor::new(router, ExtractorConfig::default())
    }

    #[tokio::test]
    async fn test_extract_stamps_type_and_vocabulary() {
        let backend = MockBackend::new("mock", r#"{"name": "Card", "type": "WrongType"}"#);
        let extractor = extractor_with(backend);

        let attributes = extractor
            .extract("some card text", RecordType::FinancialProduct)
            .await;
        assert_eq!(attributes["type"], "FinancialProduct");
        assert_eq!(attributes["vocabulary"], "schema.org");
        assert_eq!(attributes["name"], "Card");
        assert!(!attributes.contains_key("error"));
    }

    #[tokio::test]
    async fn test_extract_strips_code_fences() {
        let backend = MockBackend::new("mock", "```json\n{\"price\": 42}\n```");
        let extractor = extractor_with(backend);

        let attributes = extractor.extract("text", RecordType::Offer).await;
        assert_eq!(attributes["price"], 42);
    }

    #[tokio::test]
    async fn test_unparseable_response_degrades_to_envelope() {
        let backend = MockBackend::new("mock", "not json");
        let extractor = extractor_with(backend);

        let attributes = extractor.extract("text", RecordType::Product).await;
        assert_eq!(attributes["type"], "Product");
        assert_eq!(attributes["vocabulary"], "schema.org");
        assert_eq!(attributes["error"], "parse failure");
    }

    #[tokio::test]
    async fn test_backend_failure_degrades_to_envelope() {
        let backend = MockBackend::failing("mock", "connection refused");
        let extractor = extractor_with(backend);

        let attributes = extractor.extract("text", RecordType::Service).await;
        assert_eq!(attributes["type"], "Service");
        assert!(attributes["error"]
            .as_str()
            .unwrap()
            .contains("connection refused"));
    }

    #[tokio::test]
    async fn test_no_provider_degrades_to_envelope() {
        let router = Arc::new(ProviderRouter::new(None, None, RoutingPolicy::Auto));
        let extractor = Extractor::new(router, ExtractorConfig::default());

        let attributes = extractor.extract("text", RecordType::Product).await;
        assert!(attributes.contains_key("error"));
        assert_eq!(attributes["type"], "Product");
    }

    #[tokio::test]
    async fn test_exactly_one_completion_call() {
        let backend = MockBackend::new("mock", r#"{"name": "x"}"#);
        let extractor = extractor_with(backend.clone());

        extractor.extract("text", RecordType::Product).await;
        assert_eq!(backend.call_count(), 1);
    }
}
