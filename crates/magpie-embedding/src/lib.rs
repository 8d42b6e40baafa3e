//! Text embedding for classification and semantic search.
//!
//! Both the classifier and the store consume embeddings, so the trait lives
//! in its own crate. The deployment contract is simple: `embed` is
//! deterministic for identical input and always returns a vector of
//! `dimension()` length.
//!
//! Two local models ship with the workspace:
//!
//! - [`HashEmbedder`]: hash-based, unit-normalized vectors. No model files,
//!   no network. Real ML models (ONNX sentence transformers) slot in behind
//!   the same trait.
//! - [`KeywordEmbedder`]: one axis per registered keyword, counting
//!   occurrences. Similarity is then interpretable, which makes it the
//!   model of choice for tests and offline smoke runs.

#![warn(missing_docs)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Errors that can occur during embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Invalid input text
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model inference error
    #[error("Model inference failed: {0}")]
    InferenceFailed(String),
}

/// Trait for embedding models
pub trait EmbeddingModel: Send + Sync {
    /// Generate an embedding vector for the given text.
    ///
    /// Deterministic: identical input yields an identical vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Dimension of vectors produced by this model
    fn dimension(&self) -> usize;
}

/// Hash-based deterministic embedding model.
///
/// Hashes the input with one seed per dimension and normalizes to unit
/// length, so cosine similarity is well defined. Different texts get
/// different, uncorrelated vectors.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create a new hash embedder with the given dimension
    /// (e.g. 384, matching small sentence-transformer models).
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn hash_with_seed(text: &str, seed: u64) -> f32 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        seed.hash(&mut hasher);
        let hash_value = hasher.finish();

        // Map the hash into [-1, 1]
        let normalized = (hash_value as f64 / u64::MAX as f64) * 2.0 - 1.0;
        normalized as f32
    }
}

impl EmbeddingModel for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Empty text cannot be embedded".to_string(),
            ));
        }

        let mut embedding = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            embedding.push(Self::hash_with_seed(text, i as u64));
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut embedding {
                *value /= magnitude;
            }
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Keyword-axis embedding model.
///
/// Registers a fixed keyword list; `embed` counts case-insensitive
/// occurrences of each keyword and writes the count into that keyword's
/// axis. Text containing none of the keywords embeds to the zero vector,
/// which cosine similarity treats as 0 against everything.
pub struct KeywordEmbedder {
    keywords: Vec<String>,
}

impl KeywordEmbedder {
    /// Create a keyword embedder over the given vocabulary. Dimension equals
    /// the vocabulary size.
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

impl EmbeddingModel for KeywordEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Empty text cannot be embedded".to_string(),
            ));
        }

        let haystack = text.to_lowercase();
        let embedding = self
            .keywords
            .iter()
            .map(|keyword| haystack.matches(keyword.as_str()).count() as f32)
            .collect();

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.keywords.len()
    }
}

/// Cosine similarity between two embedding vectors: dot(a,b) / (‖a‖·‖b‖).
///
/// Zero vectors yield 0.0 rather than a division fault.
///
/// # Panics
///
/// Panics if the vectors have different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vectors must have same length");

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
