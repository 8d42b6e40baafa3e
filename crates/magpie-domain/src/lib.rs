//! Magpie Domain Layer
//!
//! Core types shared by every other crate in the workspace: the canonical
//! `Page` record, the fixed `Industry` and `RecordType` vocabularies, the
//! vector-index payload, and the `PageStore` trait seam that the storage
//! layer implements.
//!
//! ## Key Concepts
//!
//! - **Page**: the authoritative structured representation of one crawled URL
//! - **Industry**: coarse domain label scoping classification and retrieval
//! - **RecordType**: the canonical schema.org vocabulary type for a page
//! - **VectorEntry**: the payload stored next to an embedding in the index
//!
//! Infrastructure implementations (SQLite, HNSW, HTTP) live in other crates;
//! this crate holds data and trait definitions only.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod industry;
pub mod page;
pub mod record_type;
pub mod traits;

pub use industry::Industry;
pub use page::{
    now_millis, Attributes, Page, PageDraft, PageId, PageMetadata, SearchHit, VectorEntry,
};
pub use record_type::RecordType;
pub use traits::PageStore;
