//! Trait definitions for external interactions
//!
//! These traits define the boundary between domain logic and infrastructure.
//! Implementations live in other crates.

use crate::{Industry, Page, PageDraft, PageId, SearchHit};

/// Dual-store persistence for pages.
///
/// Implemented by the storage layer (magpie-store). `save` is an upsert
/// keyed by URL: the canonical write is authoritative, the vector write is
/// best-effort and must never fail the call.
pub trait PageStore {
    /// Error type for store operations
    type Error;

    /// Upsert the canonical record and (best-effort) its vector-index twin.
    /// Returns the stable page id.
    fn save(&mut self, draft: PageDraft) -> Result<PageId, Self::Error>;

    /// Exact-match lookup by URL.
    fn get_by_url(&self, url: &str) -> Result<Option<Page>, Self::Error>;

    /// Nearest-neighbor search over the vector index, re-joined to canonical
    /// pages, ordered by descending similarity as the index returned them.
    fn search_similar(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, Self::Error>;

    /// Pages for one industry, ordered by `updated_at` descending.
    fn get_by_industry(&self, industry: Industry, limit: usize)
        -> Result<Vec<Page>, Self::Error>;
}
