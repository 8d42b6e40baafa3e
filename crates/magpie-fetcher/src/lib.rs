//! Magpie Fetcher
//!
//! Retrieves a web page and reduces it to the inputs the ingestion pipeline
//! needs: whitespace-normalized text and page-level metadata.
//!
//! # Limitations
//!
//! - No JavaScript rendering (static HTML only)

#![warn(missing_docs)]

use async_trait::async_trait;
use magpie_domain::PageMetadata;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default browser-like User-Agent; some sites reject unknown agents
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default request timeout (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur while fetching a page
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network-level failure
    #[error("Request failed: {0}")]
    Http(String),

    /// Non-success HTTP status
    #[error("HTTP {status} for {url}")]
    Status {
        /// Response status code
        status: u16,
        /// Requested URL
        url: String,
    },
}

/// One fetched and pre-processed web page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The fetched URL
    pub url: String,
    /// Raw HTML body
    pub html: String,
    /// Whitespace-normalized text with script/style/nav boilerplate removed
    pub text: String,
    /// Page-level metadata lifted from the head
    pub metadata: PageMetadata,
}

/// Retrieves one page for ingestion.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch and pre-process the page at `url`.
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// HTTP fetcher backed by reqwest + scraper.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default user agent and timeout.
    pub fn new() -> Self {
        Self::with_options(DEFAULT_USER_AGENT, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a fetcher with an explicit user agent and timeout.
    pub fn with_options(user_agent: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .unwrap();
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        debug!(url = %url, "fetching page");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        Ok(parse_page(url, html))
    }
}

/// Serves canned pages; unknown URLs yield a 404-style error. Test double
/// for the ingestion pipeline.
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
}

impl StaticFetcher {
    /// Create an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a canned HTML body for a URL.
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        match self.pages.get(url) {
            Some(html) => Ok(parse_page(url, html.clone())),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

fn parse_page(url: &str, html: String) -> FetchedPage {
    let document = Html::parse_document(&html);
    let metadata = extract_metadata(&document);
    let text = extract_text(&document);
    FetchedPage {
        url: url.to_string(),
        html,
        text,
        metadata,
    }
}

/// Body text with boilerplate elements removed and whitespace collapsed.
fn extract_text(document: &Html) -> String {
    // Strip non-content elements by re-serializing without them
    let unwanted = ["script", "style", "noscript", "nav", "header", "footer"];
    let mut body_html = match Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
    {
        Some(body) => body.html(),
        None => document.html(),
    };
    let parsed = Html::parse_fragment(&body_html);
    for selector_str in unwanted {
        if let Ok(selector) = Selector::parse(selector_str) {
            for element in parsed.select(&selector) {
                body_html = body_html.replace(&element.html(), " ");
            }
        }
    }

    let stripped = Html::parse_fragment(&body_html);
    let text: String = stripped.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_metadata(document: &Html) -> PageMetadata {
    PageMetadata {
        title: select_text(document, "title"),
        description: select_meta(document, "meta[name='description']"),
        keywords: select_meta(document, "meta[name='keywords']")
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect(),
        og_title: select_meta(document, "meta[property='og:title']"),
        og_description: select_meta(document, "meta[property='og:description']"),
        og_image: select_meta(document, "meta[property='og:image']"),
    }
}

fn select_text(document: &Html, selector_str: &str) -> String {
    Selector::parse(selector_str)
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn select_meta(document: &Html, selector_str: &str) -> String {
    Selector::parse(selector_str)
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .and_then(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .unwrap_or_default()
}
