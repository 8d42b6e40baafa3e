//! Magpie Retrieval Pipeline
//!
//! Retrieval-augmented generation over the crawled corpus: retrieve similar
//! pages from the store, format them into a context block, and generate a
//! grounded answer (or a structured comparison) citing that context.
//!
//! Generation failures never fault a request. They come back inside the
//! response as an `error` field alongside an explanatory answer, so the
//! request layer can always render something.

#![warn(missing_docs)]

use magpie_domain::{Industry, PageStore, RecordType, SearchHit};
use magpie_llm::{ChatMessage, CompletionOptions, ProviderRouter};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, warn};

/// Default number of pages retrieved as context
pub const DEFAULT_MAX_CONTEXT_ITEMS: usize = 5;

/// Comparison considers at most this many retrieved items
const MAX_COMPARE_ITEMS: usize = 5;

const QUERY_TEMPERATURE: f32 = 0.3;
const QUERY_MAX_TOKENS: u32 = 1500;
const COMPARE_MAX_TOKENS: u32 = 2000;

/// Fixed answer when retrieval finds nothing
pub const NO_RESULTS_ANSWER: &str = "No relevant information found in the crawled corpus.";

/// Fixed answer when comparison lacks a second item
pub const TOO_FEW_ITEMS_ANSWER: &str = "Need at least 2 items to compare.";

const ANSWER_SYSTEM_PROMPT: &str = "You are an intelligent assistant that answers questions \
based on the provided context from crawled web pages.\n\
The context contains structured data extracted from various websites.\n\
Answer the user's question accurately using only the information provided in the context.\n\
If the context doesn't contain enough information, say so clearly.\n\
Always cite sources when providing specific information.";

const COMPARE_SYSTEM_PROMPT: &str = "You are a comparison expert. Compare the provided items \
based on the user's query.\n\
Highlight similarities, differences, advantages, and disadvantages.\n\
Present the comparison in a clear, structured format.";

/// Attribute keys that belong to the envelope, not the data
const RESERVED_KEYS: [&str; 3] = ["type", "vocabulary", "id"];

/// Errors that can occur in the retrieval pipeline
#[derive(Error, Debug)]
pub enum RagError {
    /// Store-side retrieval failure
    #[error("Store error: {0}")]
    Store(String),
}

/// A cited source attached to a query response
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    /// Page URL
    pub url: String,
    /// Page title
    pub title: String,
    /// Industry label
    pub industry: Industry,
    /// Record type
    pub record_type: RecordType,
    /// Similarity reported by retrieval
    pub similarity_score: f32,
}

/// Response from [`RetrievalPipeline::query`]
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    /// Generated answer (or a fixed/explanatory string on degradation)
    pub answer: String,
    /// The original query
    pub query: String,
    /// Cited sources, present when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceRef>>,
    /// Number of retrieved pages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources_count: Option<usize>,
    /// Backend that served the generation call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Generation failure detail, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A cited source attached to a comparison response
#[derive(Debug, Clone, Serialize)]
pub struct CompareSource {
    /// Page URL
    pub url: String,
    /// Page title
    pub title: String,
}

/// Response from [`RetrievalPipeline::compare`]
#[derive(Debug, Serialize)]
pub struct CompareResponse {
    /// Generated comparison (or a fixed/explanatory string on degradation)
    pub answer: String,
    /// The original query
    pub query: String,
    /// Number of items actually compared
    pub items_compared: usize,
    /// The compared items
    pub sources: Vec<CompareSource>,
    /// Retrieved count when below the comparison threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_found: Option<usize>,
    /// Generation failure detail, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Retrieve-format-generate-cite pipeline over a [`PageStore`].
pub struct RetrievalPipeline<S: PageStore> {
    store: Arc<Mutex<S>>,
    router: Arc<ProviderRouter>,
    max_context_items: usize,
}

impl<S> RetrievalPipeline<S>
where
    S: PageStore,
    S::Error: std::fmt::Display,
{
    /// Create a pipeline over a shared store and provider router.
    pub fn new(
        store: Arc<Mutex<S>>,
        router: Arc<ProviderRouter>,
        max_context_items: usize,
    ) -> Self {
        Self {
            store,
            router,
            max_context_items,
        }
    }

    /// Retrieve context pages for a query, optionally filtered by industry.
    ///
    /// The industry filter is applied after retrieval, so a filtered call
    /// may return fewer than `max_context_items` pages, including zero.
    pub fn retrieve(
        &self,
        query: &str,
        industry: Option<Industry>,
    ) -> Result<Vec<SearchHit>, RagError> {
        let store = self.store.lock().unwrap();
        let mut hits = store
            .search_similar(query, self.max_context_items)
            .map_err(|e| RagError::Store(e.to_string()))?;
        drop(store);

        if let Some(industry) = industry {
            hits.retain(|hit| hit.page.industry == industry);
        }
        debug!(hits = hits.len(), "context retrieved");
        Ok(hits)
    }

    /// Answer a question grounded in retrieved context.
    pub async fn query(
        &self,
        query: &str,
        industry: Option<Industry>,
        include_sources: bool,
    ) -> Result<QueryResponse, RagError> {
        let hits = self.retrieve(query, industry)?;

        if hits.is_empty() {
            return Ok(QueryResponse {
                answer: NO_RESULTS_ANSWER.to_string(),
                query: query.to_string(),
                sources: Some(Vec::new()),
                sources_count: Some(0),
                model: None,
                error: None,
            });
        }

        let context = format_context(&hits);
        let messages = vec![
            ChatMessage::system(ANSWER_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Context from crawled web pages:\n{context}\n\n\
Question: {query}\n\n\
Please provide a comprehensive answer based on the context above. If you \
reference specific information, mention which document it came from."
            )),
        ];
        let options = CompletionOptions {
            temperature: QUERY_TEMPERATURE,
            max_tokens: QUERY_MAX_TOKENS,
            stream: false,
        };

        let (answer, error) = match self.router.complete(&messages, &options).await {
            Ok(answer) => (answer, None),
            Err(e) => {
                warn!(error = %e, "answer generation failed");
                (format!("Error generating answer: {}", e), Some(e.to_string()))
            }
        };

        let (sources, sources_count) = if include_sources {
            let sources = hits
                .iter()
                .map(|hit| SourceRef {
                    url: hit.page.url.clone(),
                    title: hit.page.title.clone(),
                    industry: hit.page.industry,
                    record_type: hit.page.record_type,
                    similarity_score: hit.similarity_score,
                })
                .collect();
            (Some(sources), Some(hits.len()))
        } else {
            (None, None)
        };

        Ok(QueryResponse {
            answer,
            query: query.to_string(),
            sources,
            sources_count,
            model: Some(self.router.current_provider()),
            error,
        })
    }

    /// Compare retrieved items against each other.
    pub async fn compare(
        &self,
        query: &str,
        industry: Option<Industry>,
    ) -> Result<CompareResponse, RagError> {
        let hits = self.retrieve(query, industry)?;

        if hits.len() < 2 {
            return Ok(CompareResponse {
                answer: TOO_FEW_ITEMS_ANSWER.to_string(),
                query: query.to_string(),
                items_compared: 0,
                sources: Vec::new(),
                items_found: Some(hits.len()),
                error: None,
            });
        }

        let items = &hits[..hits.len().min(MAX_COMPARE_ITEMS)];
        let mut context = String::from("Compare the following items:\n\n");
        for (i, hit) in items.iter().enumerate() {
            let data = serde_json::to_string_pretty(&hit.page.attributes)
                .unwrap_or_else(|_| "{}".to_string());
            context.push_str(&format!(
                "Item {n}: {title}\nURL: {url}\nData: {data}\n\n",
                n = i + 1,
                title = hit.page.title,
                url = hit.page.url,
            ));
        }

        let messages = vec![
            ChatMessage::system(COMPARE_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "{context}\nUser Query: {query}\n\nProvide a detailed comparison of the items above."
            )),
        ];
        let options = CompletionOptions {
            temperature: QUERY_TEMPERATURE,
            max_tokens: COMPARE_MAX_TOKENS,
            stream: false,
        };

        let (answer, error) = match self.router.complete(&messages, &options).await {
            Ok(answer) => (answer, None),
            Err(e) => {
                warn!(error = %e, "comparison generation failed");
                (
                    format!("Error generating comparison: {}", e),
                    Some(e.to_string()),
                )
            }
        };

        Ok(CompareResponse {
            answer,
            query: query.to_string(),
            items_compared: items.len(),
            sources: items
                .iter()
                .map(|hit| CompareSource {
                    url: hit.page.url.clone(),
                    title: hit.page.title.clone(),
                })
                .collect(),
            items_found: None,
            error,
        })
    }
}

/// Format retrieved pages into numbered `[Document N]` context blocks.
pub fn format_context(hits: &[SearchHit]) -> String {
    let mut parts = Vec::with_capacity(hits.len());

    for (i, hit) in hits.iter().enumerate() {
        let mut block = format!(
            "\n[Document {n}]\nURL: {url}\nTitle: {title}\nIndustry: {industry}\nRecord Type: {record_type}\n",
            n = i + 1,
            url = hit.page.url,
            title = hit.page.title,
            industry = hit.page.industry,
            record_type = hit.page.record_type,
        );

        let data: Vec<(&String, &serde_json::Value)> = hit
            .page
            .attributes
            .iter()
            .filter(|(key, value)| !RESERVED_KEYS.contains(&key.as_str()) && !value.is_null())
            .collect();
        if !data.is_empty() {
            block.push_str("Data:\n");
            for (key, value) in data {
                let rendered = match value.as_str() {
                    Some(s) => s.to_string(),
                    None => value.to_string(),
                };
                block.push_str(&format!("  - {}: {}\n", key, rendered));
            }
        }

        parts.push(block);
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use magpie_domain::{Attributes, PageDraft, PageMetadata};
    use magpie_embedding::KeywordEmbedder;
    use magpie_llm::{MockBackend, RoutingPolicy};
    use magpie_store::SqliteStore;

    fn test_store() -> Arc<Mutex<SqliteStore>> {
        let embedder = Arc::new(KeywordEmbedder::new(&[
            "credit card",
            "cashback",
            "interest rate",
            "premium",
        ]));
        Arc::new(Mutex::new(SqliteStore::new(":memory:", embedder).unwrap()))
    }

    fn draft(url: &str, title: &str, industry: Industry, text: &str) -> PageDraft {
        let mut attributes = Attributes::new();
        attributes.insert("type".into(), "FinancialProduct".into());
        attributes.insert("vocabulary".into(), "schema.org".into());
        attributes.insert("name".into(), title.into());
        attributes.insert("annualFee".into(), 95.into());

        PageDraft {
            url: url.to_string(),
            title: title.to_string(),
            description: String::new(),
            industry,
            record_type: RecordType::FinancialProduct,
            attributes,
            raw_metadata: PageMetadata::default(),
            text_content: text.to_string(),
        }
    }

    fn pipeline_with(
        store: Arc<Mutex<SqliteStore>>,
        backend: MockBackend,
    ) -> RetrievalPipeline<SqliteStore> {
        let router = Arc::new(ProviderRouter::new(
            Some(Arc::new(backend)),
            None,
            RoutingPolicy::Auto,
        ));
        RetrievalPipeline::new(store, router, DEFAULT_MAX_CONTEXT_ITEMS)
    }

    fn seed(store: &Arc<Mutex<SqliteStore>>, url: &str, title: &str, text: &str) {
        store
            .lock()
            .unwrap()
            .save(draft(url, title, Industry::Banking, text))
            .unwrap();
    }

    #[tokio::test]
    async fn test_query_empty_store_short_circuits() {
        let backend = MockBackend::new("mock", "should not be called");
        let pipeline = pipeline_with(test_store(), backend.clone());

        let response = pipeline.query("best credit card", None, true).await.unwrap();
        assert_eq!(response.answer, NO_RESULTS_ANSWER);
        assert_eq!(response.sources_count, Some(0));
        assert_eq!(response.sources.unwrap().len(), 0);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_query_generates_with_sources() {
        let store = test_store();
        seed(&store, "https://example.com/card", "Platinum Card", "cashback credit card");

        let backend = MockBackend::new("groq", "The Platinum Card offers 2% cashback.");
        let pipeline = pipeline_with(store, backend.clone());

        let response = pipeline.query("cashback credit card", None, true).await.unwrap();
        assert_eq!(response.answer, "The Platinum Card offers 2% cashback.");
        assert_eq!(response.sources_count, Some(1));
        assert_eq!(response.model.as_deref(), Some("groq"));
        assert!(response.error.is_none());
        assert_eq!(backend.call_count(), 1);

        let sources = response.sources.unwrap();
        assert_eq!(sources[0].url, "https://example.com/card");
        assert!(sources[0].similarity_score > 0.0);
    }

    #[tokio::test]
    async fn test_query_without_sources() {
        let store = test_store();
        seed(&store, "https://example.com/card", "Card", "credit card");

        let pipeline = pipeline_with(store, MockBackend::new("mock", "answer"));
        let response = pipeline.query("credit card", None, false).await.unwrap();
        assert!(response.sources.is_none());
        assert!(response.sources_count.is_none());
    }

    #[tokio::test]
    async fn test_query_industry_filter_can_empty_context() {
        let store = test_store();
        seed(&store, "https://example.com/card", "Card", "credit card");

        let backend = MockBackend::new("mock", "unused");
        let pipeline = pipeline_with(store, backend.clone());

        let response = pipeline
            .query("credit card", Some(Industry::Insurance), true)
            .await
            .unwrap();
        assert_eq!(response.answer, NO_RESULTS_ANSWER);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_query_generation_failure_degrades() {
        let store = test_store();
        seed(&store, "https://example.com/card", "Card", "credit card");

        let pipeline = pipeline_with(store, MockBackend::failing("mock", "quota"));
        let response = pipeline.query("credit card", None, true).await.unwrap();
        assert!(response.answer.starts_with("Error generating answer:"));
        assert!(response.error.is_some());
        // Sources still attach even when generation failed
        assert_eq!(response.sources_count, Some(1));
    }

    #[tokio::test]
    async fn test_compare_single_item_short_circuits() {
        let store = test_store();
        seed(&store, "https://example.com/card", "Card", "credit card");

        let backend = MockBackend::new("mock", "unused");
        let pipeline = pipeline_with(store, backend.clone());

        let response = pipeline.compare("credit card", None).await.unwrap();
        assert_eq!(response.answer, TOO_FEW_ITEMS_ANSWER);
        assert_eq!(response.items_found, Some(1));
        assert_eq!(response.items_compared, 0);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_compare_two_items_generates() {
        let store = test_store();
        seed(&store, "https://example.com/a", "Card A", "cashback credit card one");
        seed(&store, "https://example.com/b", "Card B", "cashback credit card two");

        let backend = MockBackend::new("mock", "Card A has the lower fee.");
        let pipeline = pipeline_with(store, backend.clone());

        let response = pipeline.compare("credit card", None).await.unwrap();
        assert_eq!(response.answer, "Card A has the lower fee.");
        assert_eq!(response.items_compared, 2);
        assert_eq!(response.sources.len(), 2);
        assert!(response.items_found.is_none());
        assert_eq!(backend.call_count(), 1);
    }

    #[test]
    fn test_format_context_blocks() {
        let store = test_store();
        seed(&store, "https://example.com/card", "Platinum Card", "credit card");
        let hits = {
            let guard = store.lock().unwrap();
            guard.search_similar("credit card", 5).unwrap()
        };

        let context = format_context(&hits);
        assert!(context.contains("[Document 1]"));
        assert!(context.contains("URL: https://example.com/card"));
        assert!(context.contains("Industry: banking"));
        assert!(context.contains("Record Type: FinancialProduct"));
        assert!(context.contains("- name: Platinum Card"));
        assert!(context.contains("- annualFee: 95"));
        // Envelope keys stay out of the data block
        assert!(!context.contains("vocabulary"));
    }

    #[test]
    fn test_format_context_empty() {
        assert_eq!(format_context(&[]), "");
    }
}
