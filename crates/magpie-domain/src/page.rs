//! Page module - the canonical record for one crawled URL.

use crate::{Industry, RecordType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Open mapping of normalized attribute names to extracted values.
///
/// Always carries `type` and `vocabulary` keys, even when extraction failed
/// (in which case an `error` key is present instead of data).
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Unique identifier for a page, based on UUIDv7.
///
/// UUIDv7 gives chronological sortability and coordination-free generation.
/// A PageId is minted once, on the first successful save of a URL, and is
/// stable across re-crawls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(uuid::Uuid);

impl PageId {
    /// Generate a new UUIDv7-based PageId.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Parse a PageId from its string form (storage deserialization).
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid page id: {}", e))
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Page-level metadata lifted from the raw HTML, kept separate from the
/// extracted `attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// `<title>` text
    #[serde(default)]
    pub title: String,
    /// Meta description
    #[serde(default)]
    pub description: String,
    /// Meta keywords, split on commas
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Open Graph title
    #[serde(default)]
    pub og_title: String,
    /// Open Graph description
    #[serde(default)]
    pub og_description: String,
    /// Open Graph image URL
    #[serde(default)]
    pub og_image: String,
}

/// The canonical record for one crawled URL.
///
/// One Page exists per normalized URL; re-crawls update in place. The
/// canonical store is the source of truth - the vector index only carries a
/// payload subset for similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Stable identifier, generated at first successful save
    pub id: PageId,
    /// Unique key; one Page per URL
    pub url: String,
    /// Short title metadata
    pub title: String,
    /// Short description metadata
    pub description: String,
    /// Industry label, recomputed on every re-crawl
    pub industry: Industry,
    /// Canonical vocabulary type, recomputed on every re-crawl
    pub record_type: RecordType,
    /// Normalized extraction output
    pub attributes: Attributes,
    /// Raw page metadata, distinct from `attributes`
    pub raw_metadata: PageMetadata,
    /// Unix milliseconds of the first save
    pub created_at: u64,
    /// Unix milliseconds of the most recent save
    pub updated_at: u64,
}

/// Everything the storage layer needs to upsert one page.
///
/// `text_content` is not persisted in the canonical record; a bounded prefix
/// of it feeds the vector-index embedding.
#[derive(Debug, Clone)]
pub struct PageDraft {
    /// Normalized URL (upsert key)
    pub url: String,
    /// Page title
    pub title: String,
    /// Page description
    pub description: String,
    /// Classified industry
    pub industry: Industry,
    /// Detected record type
    pub record_type: RecordType,
    /// Extracted attributes
    pub attributes: Attributes,
    /// Raw page metadata
    pub raw_metadata: PageMetadata,
    /// Whitespace-normalized plain text of the page
    pub text_content: String,
}

/// Payload stored next to an embedding in the vector index.
///
/// Carries just enough to re-join against the canonical store without a
/// full vector fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    /// Canonical URL (re-join key)
    pub url: String,
    /// Page title
    pub title: String,
    /// Industry label
    pub industry: Industry,
    /// Record type
    pub record_type: RecordType,
    /// Canonical page id at write time
    pub page_id: PageId,
}

/// A page returned from similarity search, annotated with its score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// The canonical page
    #[serde(flatten)]
    pub page: Page,
    /// Cosine similarity as reported by the vector index
    pub similarity_score: f32,
}

/// Current time as unix milliseconds. Millisecond resolution keeps
/// back-to-back upserts distinguishable through `updated_at`.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_round_trip() {
        let id = PageId::new();
        let parsed = PageId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_page_id_is_chronologically_sortable() {
        let a = PageId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = PageId::new();
        assert!(a < b);
    }

    #[test]
    fn test_page_serde_round_trip() {
        let mut attributes = Attributes::new();
        attributes.insert("type".into(), "Product".into());
        attributes.insert("vocabulary".into(), "schema.org".into());
        attributes.insert("name".into(), "Widget".into());

        let page = Page {
            id: PageId::new(),
            url: "https://example.com/widget".into(),
            title: "Widget".into(),
            description: "A widget".into(),
            industry: Industry::Ecommerce,
            record_type: RecordType::Product,
            attributes,
            raw_metadata: PageMetadata::default(),
            created_at: 1,
            updated_at: 2,
        };

        let json = serde_json::to_string(&page).unwrap();
        let parsed: Page = serde_json::from_str(&json).unwrap();
        assert_eq!(page, parsed);
    }

    #[test]
    fn test_now_millis_advances() {
        let a = now_millis();
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(now_millis() > a);
    }
}
