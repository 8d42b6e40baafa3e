//! Magpie Extractor
//!
//! Converts page text into structured attributes using an LLM, then
//! normalizes them into a linked-data-style envelope.
//!
//! # Overview
//!
//! The Extractor receives a page's text together with the record type the
//! classifier picked for it, prompts the configured generation backend for
//! a JSON object of canonical fields, and post-processes the response.
//! Failures never propagate past this boundary: a backend or parse failure
//! degrades to a typed error envelope so the ingestion pipeline always has
//! attributes to persist.
//!
//! # Example Usage
//!
//! ```
//! use magpie_extractor::{normalize, Extractor, ExtractorConfig};
//! use magpie_domain::RecordType;
//! use magpie_llm::{MockBackend, ProviderRouter, RoutingPolicy};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let backend = Arc::new(MockBackend::new("mock", r#"{"name": "Gold Card"}"#));
//! let router = Arc::new(ProviderRouter::new(Some(backend), None, RoutingPolicy::Auto));
//! let extractor = Extractor::new(router, ExtractorConfig::default());
//!
//! let attributes = extractor
//!     .extract("Gold Card with 2% cashback", RecordType::FinancialProduct)
//!     .await;
//! assert_eq!(attributes["type"], "FinancialProduct");
//!
//! let envelope = normalize(&attributes, "https://example.com/gold");
//! assert_eq!(envelope["id"], "https://example.com/gold");
//! # });
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod extractor;
mod normalize;
mod parser;
mod prompt;

pub use config::ExtractorConfig;
pub use error::ExtractorError;
pub use extractor::Extractor;
pub use normalize::{normalize, VOCABULARY};
pub use prompt::PromptBuilder;
