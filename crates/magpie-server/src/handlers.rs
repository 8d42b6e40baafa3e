//! HTTP request handlers for the crawl and query API.
//!
//! Implements ingestion, lookup, search, and retrieval endpoints using axum.

use crate::app::{IngestOutcome, Pipeline, PipelineError};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use magpie_domain::Industry;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The assembled ingestion and query pipeline
    pub pipeline: Arc<Pipeline>,
}

/// Ingestion request
#[derive(Debug, Deserialize)]
pub struct CrawlRequest {
    /// URL to ingest
    pub url: String,
    /// Re-run the pipeline even when a record already exists
    #[serde(default)]
    pub force_refresh: bool,
}

/// Similarity search request
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Free-text query
    pub query: String,
    /// Maximum hits to return
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    5
}

/// Retrieval-augmented query request
#[derive(Debug, Deserialize)]
pub struct RagQueryRequest {
    /// The question to answer
    pub query: String,
    /// Restrict retrieval to one industry
    #[serde(default)]
    pub industry: Option<String>,
    /// Attach source references to the answer
    #[serde(default = "default_include_sources")]
    pub include_sources: bool,
}

fn default_include_sources() -> bool {
    true
}

/// Comparison request
#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    /// What to compare (e.g. "compare credit card fees")
    pub query: String,
    /// Restrict retrieval to one industry
    #[serde(default)]
    pub industry: Option<String>,
}

/// Industry listing query string
#[derive(Debug, Deserialize)]
pub struct IndustryListParams {
    /// Maximum pages to return
    #[serde(default = "default_industry_limit")]
    pub limit: usize,
}

fn default_industry_limit() -> usize {
    10
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Number of stored pages
    pub pages: usize,
    /// Generation backend serving requests ("none" when unconfigured)
    pub llm_provider: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Malformed or unprocessable input
    BadRequest(String),
    /// No record matching the request
    NotFound(String),
    /// Internal server error
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Fetch(e) => AppError::BadRequest(e.to_string()),
            PipelineError::NotFound(url) => AppError::NotFound(format!("No record for url: {url}")),
            other => AppError::Internal(other.to_string()),
        }
    }
}

fn parse_industry(label: Option<&str>) -> Result<Option<Industry>, AppError> {
    match label {
        None => Ok(None),
        Some(s) => Industry::parse(s)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown industry: {s}"))),
    }
}

/// GET / - Endpoint listing
async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "service": "magpie",
        "endpoints": {
            "GET /health": "Service health and corpus size",
            "POST /crawl": "Ingest a URL: {url, force_refresh}",
            "GET /crawl/:url": "Stored record for a URL",
            "POST /search": "Similarity search: {query, limit}",
            "GET /industry/:industry": "Recently updated pages for an industry",
            "POST /rag/query": "Answer a question over the corpus: {query, industry, include_sources}",
            "POST /rag/compare": "Compare retrieved items: {query, industry}",
        }
    }))
}

/// GET /health - Service health
async fn health_check(State(state): State<AppState>) -> Result<Json<HealthCheckResponse>, AppError> {
    let pages = state.pipeline.page_count()?;

    Ok(Json(HealthCheckResponse {
        status: "healthy".to_string(),
        pages,
        llm_provider: state.pipeline.current_provider(),
    }))
}

/// POST /crawl - Ingest a URL
async fn crawl(
    State(state): State<AppState>,
    Json(request): Json<CrawlRequest>,
) -> Result<Json<IngestOutcome>, AppError> {
    if request.url.trim().is_empty() {
        return Err(AppError::BadRequest("url must not be empty".to_string()));
    }

    let outcome = state
        .pipeline
        .ingest(&request.url, request.force_refresh)
        .await?;

    Ok(Json(outcome))
}

/// GET /crawl/:url - Stored record for a URL
///
/// The path segment arrives percent-decoded. A bare host like
/// `example.com/page` is retried with an `https://` prefix.
async fn get_crawled(
    State(state): State<AppState>,
    Path(url): Path<String>,
) -> Result<Json<magpie_domain::Page>, AppError> {
    if let Some(page) = state.pipeline.lookup(&url)? {
        return Ok(Json(page));
    }

    if !url.contains("://") {
        let prefixed = format!("https://{url}");
        if let Some(page) = state.pipeline.lookup(&prefixed)? {
            return Ok(Json(page));
        }
    }

    Err(AppError::NotFound(format!("No record for url: {url}")))
}

/// POST /search - Similarity search over the corpus
async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let hits = state.pipeline.search(&request.query, request.limit)?;

    Ok(Json(json!({
        "query": request.query,
        "count": hits.len(),
        "results": hits,
    })))
}

/// GET /industry/:industry - Recently updated pages for an industry
async fn list_industry(
    State(state): State<AppState>,
    Path(industry): Path<String>,
    Query(params): Query<IndustryListParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let industry = Industry::parse(&industry)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown industry: {industry}")))?;
    let pages = state.pipeline.list_by_industry(industry, params.limit)?;

    Ok(Json(json!({
        "industry": industry.as_str(),
        "count": pages.len(),
        "pages": pages,
    })))
}

/// POST /rag/query - Answer a question over the corpus
async fn rag_query(
    State(state): State<AppState>,
    Json(request): Json<RagQueryRequest>,
) -> Result<Json<magpie_rag::QueryResponse>, AppError> {
    let industry = parse_industry(request.industry.as_deref())?;
    let response = state
        .pipeline
        .ask(&request.query, industry, request.include_sources)
        .await?;

    Ok(Json(response))
}

/// POST /rag/compare - Compare retrieved items
async fn rag_compare(
    State(state): State<AppState>,
    Json(request): Json<CompareRequest>,
) -> Result<Json<magpie_rag::CompareResponse>, AppError> {
    let industry = parse_industry(request.industry.as_deref())?;
    let response = state.pipeline.compare(&request.query, industry).await?;

    Ok(Json(response))
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/crawl", post(crawl))
        .route("/crawl/:url", get(get_crawled))
        .route("/search", post(search))
        .route("/industry/:industry", get(list_industry))
        .route("/rag/query", post(rag_query))
        .route("/rag/compare", post(rag_compare))
        .with_state(state)
}
