//! Magpie Storage Layer
//!
//! Dual-store persistence for pages: SQLite holds the canonical record,
//! an HNSW index holds its vector twin for similarity search.
//!
//! # Architecture
//!
//! - SQLite for structured page data (attributes, metadata, timestamps)
//! - HNSW for nearest-neighbor search, keyed by sha256(url)
//! - The canonical write is authoritative; the vector write is best-effort
//!   and never fails a save. After a restart the in-memory index converges
//!   as pages are re-crawled.
//!
//! # Examples
//!
//! ```no_run
//! use magpie_store::SqliteStore;
//! use magpie_embedding::HashEmbedder;
//! use std::sync::Arc;
//!
//! let store = SqliteStore::new(":memory:", Arc::new(HashEmbedder::new(384))).unwrap();
//! ```

#![warn(missing_docs)]

pub mod vector_index;

use magpie_domain::{
    now_millis, Industry, Page, PageDraft, PageId, PageMetadata, PageStore, SearchHit, VectorEntry,
};
use magpie_embedding::EmbeddingModel;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub use vector_index::{VectorIndex, VectorIndexError};

/// Text prefix length fed to the embedding model when indexing a page
const EMBED_PREFIX_CHARS: usize = 1000;

/// HNSW search quality parameter
const EF_SEARCH: usize = 64;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// SQLite + HNSW implementation of [`PageStore`]
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Callers share a store behind a
/// mutex or give each thread its own instance.
pub struct SqliteStore {
    conn: Connection,
    index: VectorIndex,
    embedder: Arc<dyn EmbeddingModel>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path.
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(
        path: P,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let index = VectorIndex::new(embedder.dimension());
        let store = Self {
            conn,
            index,
            embedder,
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Number of canonical page records
    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Best-effort vector write after a successful canonical upsert.
    /// Failures are logged and swallowed; the index converges on the next
    /// successful save.
    fn write_vector(&mut self, draft: &PageDraft, page_id: PageId) {
        let sample = char_prefix(&draft.text_content, EMBED_PREFIX_CHARS);
        if sample.is_empty() {
            debug!(url = %draft.url, "no text content, vector write skipped");
            return;
        }

        let embedding = match self.embedder.embed(sample) {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(url = %draft.url, error = %e, "embedding failed, vector write skipped");
                return;
            }
        };
        // A zero vector has no cosine direction
        if embedding.iter().all(|v| *v == 0.0) {
            warn!(url = %draft.url, "zero embedding, vector write skipped");
            return;
        }

        let entry = VectorEntry {
            url: draft.url.clone(),
            title: draft.title.clone(),
            industry: draft.industry,
            record_type: draft.record_type,
            page_id,
        };
        if let Err(e) = self.index.upsert(&url_key(&draft.url), entry, &embedding) {
            warn!(url = %draft.url, error = %e, "vector index upsert failed");
        }
    }

    fn row_to_page(row: &Row<'_>) -> rusqlite::Result<Page> {
        let id_str: String = row.get(0)?;
        let industry_str: String = row.get(4)?;
        let record_type_str: String = row.get(5)?;
        let attributes_json: String = row.get(6)?;
        let raw_metadata_json: String = row.get(7)?;

        let id = PageId::from_string(&id_str).map_err(|e| conversion_error(0, e))?;
        let industry = Industry::parse(&industry_str)
            .ok_or_else(|| conversion_error(4, format!("Unknown industry: {}", industry_str)))?;
        let record_type = magpie_domain::RecordType::parse(&record_type_str).ok_or_else(|| {
            conversion_error(5, format!("Unknown record type: {}", record_type_str))
        })?;
        let attributes =
            serde_json::from_str(&attributes_json).map_err(|e| conversion_error(6, e.to_string()))?;
        let raw_metadata: PageMetadata = serde_json::from_str(&raw_metadata_json)
            .map_err(|e| conversion_error(7, e.to_string()))?;

        Ok(Page {
            id,
            url: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            industry,
            record_type,
            attributes,
            raw_metadata,
            created_at: row.get::<_, i64>(8)? as u64,
            updated_at: row.get::<_, i64>(9)? as u64,
        })
    }
}

const PAGE_COLUMNS: &str =
    "id, url, title, description, industry, record_type, attributes, raw_metadata, created_at, updated_at";

impl PageStore for SqliteStore {
    type Error = StoreError;

    fn save(&mut self, draft: PageDraft) -> Result<PageId, Self::Error> {
        let now = now_millis();
        let attributes_json = serde_json::to_string(&draft.attributes)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let raw_metadata_json = serde_json::to_string(&draft.raw_metadata)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;

        // Fresh id for the insert arm; a conflicting row keeps its own id
        let candidate_id = PageId::new();
        self.conn.execute(
            "INSERT INTO pages (id, url, title, description, industry, record_type, attributes, raw_metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(url) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 industry = excluded.industry,
                 record_type = excluded.record_type,
                 attributes = excluded.attributes,
                 raw_metadata = excluded.raw_metadata,
                 updated_at = excluded.updated_at",
            params![
                candidate_id.to_string(),
                &draft.url,
                &draft.title,
                &draft.description,
                draft.industry.as_str(),
                draft.record_type.as_str(),
                &attributes_json,
                &raw_metadata_json,
                now as i64,
                now as i64,
            ],
        )?;

        // Read the id back: on conflict it is the original row's, not ours
        let stored_id: String = self.conn.query_row(
            "SELECT id FROM pages WHERE url = ?1",
            params![&draft.url],
            |row| row.get(0),
        )?;
        let page_id = PageId::from_string(&stored_id).map_err(StoreError::InvalidData)?;

        self.write_vector(&draft, page_id);
        debug!(url = %draft.url, page_id = %page_id, "page saved");
        Ok(page_id)
    }

    fn get_by_url(&self, url: &str) -> Result<Option<Page>, Self::Error> {
        let page = self
            .conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE url = ?1", PAGE_COLUMNS),
                params![url],
                Self::row_to_page,
            )
            .optional()?;
        Ok(page)
    }

    fn search_similar(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, Self::Error> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let embedding = match self.embedder.embed(query) {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "query embedding failed, returning no hits");
                return Ok(Vec::new());
            }
        };
        if embedding.iter().all(|v| *v == 0.0) {
            return Ok(Vec::new());
        }

        let neighbours = match self.index.search(&embedding, limit, EF_SEARCH) {
            Ok(neighbours) => neighbours,
            Err(e) => {
                warn!(error = %e, "vector search failed, returning no hits");
                return Ok(Vec::new());
            }
        };

        // Re-join against the canonical store; index order is preserved
        let mut hits = Vec::with_capacity(neighbours.len());
        for (entry, similarity) in neighbours {
            match self.get_by_url(&entry.url)? {
                Some(page) => hits.push(SearchHit {
                    page,
                    similarity_score: similarity,
                }),
                None => {
                    debug!(url = %entry.url, "stale vector hit dropped");
                }
            }
        }
        Ok(hits)
    }

    fn get_by_industry(&self, industry: Industry, limit: usize) -> Result<Vec<Page>, Self::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM pages WHERE industry = ?1 ORDER BY updated_at DESC LIMIT ?2",
            PAGE_COLUMNS
        ))?;
        let pages = stmt
            .query_map(params![industry.as_str(), limit as i64], Self::row_to_page)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages)
    }
}

/// Stable vector-index key: sha256 hex digest of the URL.
fn url_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn conversion_error(
    column: usize,
    message: impl Into<String>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            message.into(),
        )),
    )
}
