//! HNSW vector index with URL-keyed upsert semantics
//!
//! # Architecture
//!
//! - In-memory index, rebuilt organically from re-crawls after a restart
//! - HNSW supports no deletes, so an upsert inserts a fresh internal id and
//!   repoints the key's live-id mapping; superseded ids stay in the graph
//!   and are filtered out of search results
//!
//! # HNSW Parameters
//!
//! - **M**: Number of bi-directional links per node (default: 16)
//! - **efConstruction**: Size of dynamic candidate list during construction (default: 200)
//! - **efSearch**: Size of dynamic candidate list during search (default: 64)

use hnsw_rs::prelude::*;
use magpie_domain::VectorEntry;
use std::collections::HashMap;
use thiserror::Error;

const DEFAULT_M: usize = 16;
const DEFAULT_EF_CONSTRUCTION: usize = 200;
const DEFAULT_MAX_ELEMENTS: usize = 1_000_000;

/// Errors that can occur during vector index operations
#[derive(Error, Debug)]
pub enum VectorIndexError {
    /// Invalid embedding dimension
    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        actual: usize,
    },
}

struct IndexedEntry {
    key: String,
    entry: VectorEntry,
}

/// HNSW wrapper storing one live `(key, VectorEntry)` pair per URL key.
pub struct VectorIndex {
    dimension: usize,
    hnsw: Hnsw<'static, f32, DistCosine>,
    /// Every internal id ever inserted, live or superseded
    entries: HashMap<usize, IndexedEntry>,
    /// Current internal id per key
    live: HashMap<String, usize>,
    next_id: usize,
}

impl VectorIndex {
    /// Create a new vector index for embeddings of the given dimension.
    pub fn new(dimension: usize) -> Self {
        let nb_layer = 16.min((DEFAULT_MAX_ELEMENTS as f32).ln().trunc() as usize);

        let hnsw = Hnsw::<'static, f32, DistCosine>::new(
            DEFAULT_M,
            DEFAULT_MAX_ELEMENTS,
            nb_layer,
            DEFAULT_EF_CONSTRUCTION,
            DistCosine {},
        );

        Self {
            dimension,
            hnsw,
            entries: HashMap::new(),
            live: HashMap::new(),
            next_id: 0,
        }
    }

    /// Insert or replace the entry stored under `key`.
    ///
    /// A replaced entry's old vector remains in the HNSW graph but is
    /// excluded from search results from this point on.
    pub fn upsert(
        &mut self,
        key: &str,
        entry: VectorEntry,
        embedding: &[f32],
    ) -> Result<(), VectorIndexError> {
        if embedding.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let internal_id = self.next_id;
        self.next_id += 1;

        let embedding_vec = embedding.to_vec();
        self.hnsw.insert((&embedding_vec, internal_id));

        self.entries.insert(
            internal_id,
            IndexedEntry {
                key: key.to_string(),
                entry,
            },
        );
        self.live.insert(key.to_string(), internal_id);

        Ok(())
    }

    /// Search for the k nearest live entries to the given embedding.
    ///
    /// Returns `(entry, similarity)` pairs sorted by similarity descending.
    /// Over-fetches by the superseded count so stale graph nodes cannot
    /// crowd out live ones.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<(VectorEntry, f32)>, VectorIndexError> {
        if query.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if self.live.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let superseded = self.entries.len() - self.live.len();
        let fetch = k + superseded;
        let neighbours = self.hnsw.search(query, fetch, ef_search.max(fetch));

        let results = neighbours
            .into_iter()
            .filter_map(|neighbour| {
                let indexed = self.entries.get(&neighbour.d_id)?;
                // Only the key's current id counts; superseded ids are stale
                if self.live.get(&indexed.key) != Some(&neighbour.d_id) {
                    return None;
                }
                // Cosine distance -> cosine similarity
                Some((indexed.entry.clone(), 1.0 - neighbour.distance))
            })
            .take(k)
            .collect();

        Ok(results)
    }

    /// Number of live entries in the index
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Check if the index holds no live entries
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magpie_domain::{Industry, PageId, RecordType};

    fn entry(url: &str) -> VectorEntry {
        VectorEntry {
            url: url.to_string(),
            title: "t".to_string(),
            industry: Industry::General,
            record_type: RecordType::WebPage,
            page_id: PageId::new(),
        }
    }

    #[test]
    fn test_index_creation() {
        let index = VectorIndex::new(384);
        assert_eq!(index.dimension, 384);
        assert!(index.is_empty());
    }

    #[test]
    fn test_upsert_and_search() {
        let mut index = VectorIndex::new(3);

        index
            .upsert("a", entry("https://a.example"), &[1.0, 0.0, 0.0])
            .unwrap();
        index
            .upsert("b", entry("https://b.example"), &[0.0, 1.0, 0.0])
            .unwrap();
        assert_eq!(index.len(), 2);

        let results = index.search(&[1.0, 0.0, 0.0], 2, 64).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.url, "https://a.example");
        assert!(results[0].1 > 0.99);
        assert!(results[1].1 < 0.1);
    }

    #[test]
    fn test_upsert_replaces_live_entry() {
        let mut index = VectorIndex::new(3);

        index
            .upsert("a", entry("https://a.example"), &[1.0, 0.0, 0.0])
            .unwrap();
        index
            .upsert("a", entry("https://a.example"), &[0.0, 0.0, 1.0])
            .unwrap();

        // Still one live entry for the key
        assert_eq!(index.len(), 1);

        // A query matching the old vector must not surface the stale node
        let results = index.search(&[1.0, 0.0, 0.0], 5, 64).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].1 < 0.1);

        let results = index.search(&[0.0, 0.0, 1.0], 5, 64).unwrap();
        assert!(results[0].1 > 0.99);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = VectorIndex::new(384);
        let result = index.upsert("a", entry("https://a.example"), &[0.1; 128]);
        assert!(matches!(
            result,
            Err(VectorIndexError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            index.search(&[0.1; 128], 5, 64),
            Err(VectorIndexError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_search_empty_index() {
        let index = VectorIndex::new(3);
        assert!(index.search(&[1.0, 0.0, 0.0], 5, 64).unwrap().is_empty());
    }

    #[test]
    fn test_search_caps_at_k() {
        let mut index = VectorIndex::new(3);
        for i in 0..10 {
            let v = [1.0, i as f32 / 10.0, 0.0];
            index
                .upsert(&format!("k{}", i), entry(&format!("https://{}.example", i)), &v)
                .unwrap();
        }
        let results = index.search(&[1.0, 0.0, 0.0], 3, 64).unwrap();
        assert_eq!(results.len(), 3);
    }
}
