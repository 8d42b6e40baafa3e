//! Ingestion and query pipeline behind the HTTP surface.
//!
//! Wires the components together in dependency order: embedder, store,
//! provider router, classifier, extractor, retrieval pipeline, fetcher.
//! No ambient singletons; everything hangs off one [`Pipeline`] value.

use crate::config::ServerConfig;
use magpie_classifier::{Classifier, ClassifierError};
use magpie_domain::{Industry, Page, PageDraft, PageStore, SearchHit};
use magpie_embedding::{EmbeddingModel, HashEmbedder};
use magpie_extractor::{normalize, Extractor, ExtractorConfig};
use magpie_fetcher::{FetchError, Fetcher, HttpFetcher};
use magpie_llm::{ChatBackend, GroqBackend, OpenAiBackend, ProviderRouter, RoutingPolicy};
use magpie_rag::{CompareResponse, QueryResponse, RagError, RetrievalPipeline};
use magpie_store::{SqliteStore, StoreError};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::info;

/// Errors surfaced by pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Page fetch failed; ingestion aborts before classification
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Classification failed
    #[error("Classification failed: {0}")]
    Classify(#[from] ClassifierError),

    /// Canonical store failure
    #[error("Store failed: {0}")]
    Store(#[from] StoreError),

    /// Retrieval failure
    #[error("Retrieval failed: {0}")]
    Rag(#[from] RagError),

    /// No stored record for the URL
    #[error("No record for url: {0}")]
    NotFound(String),
}

/// Result of one ingest call
#[derive(Debug, Serialize)]
pub struct IngestOutcome {
    /// The canonical record after the call
    #[serde(flatten)]
    pub page: Page,
    /// False when an existing record short-circuited the pipeline
    pub refreshed: bool,
}

/// The assembled ingestion + query pipeline.
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    classifier: Classifier,
    extractor: Extractor,
    store: Arc<Mutex<SqliteStore>>,
    router: Arc<ProviderRouter>,
    rag: RetrievalPipeline<SqliteStore>,
}

impl Pipeline {
    /// Assemble the pipeline from configuration.
    pub fn from_config(config: &ServerConfig) -> Result<Self, PipelineError> {
        let embedder: Arc<dyn EmbeddingModel> =
            Arc::new(HashEmbedder::new(config.embedding_dimension));
        let router = build_router(config);
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::with_options(
            &config.fetcher.user_agent,
            config.fetcher.timeout_secs,
        ));

        Self::with_components(
            fetcher,
            embedder,
            router,
            &config.database_path,
            config.rag.max_context_items,
        )
    }

    /// Assemble the pipeline from explicit components (test entry point).
    pub fn with_components(
        fetcher: Arc<dyn Fetcher>,
        embedder: Arc<dyn EmbeddingModel>,
        router: Arc<ProviderRouter>,
        database_path: &str,
        max_context_items: usize,
    ) -> Result<Self, PipelineError> {
        let store = Arc::new(Mutex::new(SqliteStore::new(database_path, embedder.clone())?));
        let classifier = Classifier::new(embedder)
            .map_err(PipelineError::Classify)?;
        let extractor = Extractor::new(router.clone(), ExtractorConfig::default());
        let rag = RetrievalPipeline::new(store.clone(), router.clone(), max_context_items);

        Ok(Self {
            fetcher,
            classifier,
            extractor,
            store,
            router,
            rag,
        })
    }

    /// Ingest one URL: fetch, classify, extract, normalize, persist.
    ///
    /// With `force_refresh` unset, an existing record for the URL
    /// short-circuits the whole pipeline and is returned unchanged.
    /// A re-crawl recomputes and overwrites industry and record type.
    pub async fn ingest(&self, url: &str, force_refresh: bool) -> Result<IngestOutcome, PipelineError> {
        if !force_refresh {
            let existing = {
                let store = self.store.lock().unwrap();
                store.get_by_url(url)?
            };
            if let Some(page) = existing {
                info!(url = %url, "serving stored record, refresh not forced");
                return Ok(IngestOutcome {
                    page,
                    refreshed: false,
                });
            }
        }

        let fetched = self.fetcher.fetch(url).await?;

        let industry = self.classifier.classify_industry(&fetched.text)?;
        let record_type = self.classifier.detect_record_type(&fetched.text, industry)?;
        let attributes = self.extractor.extract(&fetched.text, record_type).await;
        let attributes = normalize(&attributes, url);

        let title = if fetched.metadata.title.is_empty() {
            fetched.metadata.og_title.clone()
        } else {
            fetched.metadata.title.clone()
        };

        let draft = PageDraft {
            url: url.to_string(),
            title,
            description: fetched.metadata.description.clone(),
            industry,
            record_type,
            attributes,
            raw_metadata: fetched.metadata,
            text_content: fetched.text,
        };

        let page = {
            let mut store = self.store.lock().unwrap();
            store.save(draft)?;
            store
                .get_by_url(url)?
                .ok_or_else(|| PipelineError::NotFound(url.to_string()))?
        };

        info!(url = %url, industry = %page.industry, record_type = %page.record_type, "page ingested");
        Ok(IngestOutcome {
            page,
            refreshed: true,
        })
    }

    /// Stored record for a URL.
    pub fn lookup(&self, url: &str) -> Result<Option<Page>, PipelineError> {
        let store = self.store.lock().unwrap();
        Ok(store.get_by_url(url)?)
    }

    /// Similarity search over the corpus.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, PipelineError> {
        let store = self.store.lock().unwrap();
        Ok(store.search_similar(query, limit)?)
    }

    /// Most recently updated pages for an industry.
    pub fn list_by_industry(
        &self,
        industry: Industry,
        limit: usize,
    ) -> Result<Vec<Page>, PipelineError> {
        let store = self.store.lock().unwrap();
        Ok(store.get_by_industry(industry, limit)?)
    }

    /// Answer a question over the corpus.
    pub async fn ask(
        &self,
        query: &str,
        industry: Option<Industry>,
        include_sources: bool,
    ) -> Result<QueryResponse, PipelineError> {
        Ok(self.rag.query(query, industry, include_sources).await?)
    }

    /// Compare retrieved items.
    pub async fn compare(
        &self,
        query: &str,
        industry: Option<Industry>,
    ) -> Result<CompareResponse, PipelineError> {
        Ok(self.rag.compare(query, industry).await?)
    }

    /// Number of stored pages.
    pub fn page_count(&self) -> Result<usize, PipelineError> {
        let store = self.store.lock().unwrap();
        Ok(store.count()?)
    }

    /// Name of the generation backend that served the most recent call.
    pub fn current_provider(&self) -> String {
        self.router.current_provider()
    }
}

fn build_router(config: &ServerConfig) -> Arc<ProviderRouter> {
    let primary: Option<Arc<dyn ChatBackend>> = if config.llm.openai_api_key.is_empty() {
        None
    } else {
        Some(Arc::new(OpenAiBackend::with_base_url(
            config.llm.openai_base_url.clone(),
            config.llm.openai_api_key.clone(),
            config.llm.openai_model.clone(),
            OpenAiBackend::DEFAULT_TIMEOUT_SECS,
        )))
    };
    let fallback: Option<Arc<dyn ChatBackend>> = if config.llm.groq_api_key.is_empty() {
        None
    } else {
        Some(Arc::new(GroqBackend::with_base_url(
            config.llm.groq_base_url.clone(),
            config.llm.groq_api_key.clone(),
            config.llm.groq_model.clone(),
            GroqBackend::DEFAULT_TIMEOUT_SECS,
        )))
    };

    let policy = match config.llm.policy.as_str() {
        "primary" => RoutingPolicy::Primary,
        "fallback" => RoutingPolicy::Fallback,
        _ => RoutingPolicy::Auto,
    };

    Arc::new(ProviderRouter::new(primary, fallback, policy))
}
