//! Embedding-based page classification.
//!
//! Industry and record type are decided by nearest-prototype matching: each
//! classified industry's keyword bag and each record type's description are
//! embedded once at construction, then incoming text is compared by cosine
//! similarity. No LLM call is involved, so classification is deterministic
//! for a given embedding model.

#![warn(missing_docs)]

use magpie_domain::{Industry, RecordType};
use magpie_embedding::{cosine_similarity, EmbeddingError, EmbeddingModel};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Longest text prefix fed to the embedding model during classification.
/// Page bodies run to hundreds of kilobytes; the opening text carries the
/// signal.
const CLASSIFY_PREFIX_CHARS: usize = 1000;

/// Errors that can occur during classification
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// The embedding model failed
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// Nearest-prototype classifier for industries and record types.
pub struct Classifier {
    embedder: Arc<dyn EmbeddingModel>,
    industry_prototypes: Vec<(Industry, Vec<f32>)>,
    type_prototypes: HashMap<RecordType, Vec<f32>>,
}

impl Classifier {
    /// Build a classifier, embedding every prototype up front.
    ///
    /// Prototypes are fixed for the classifier's lifetime; a model change
    /// requires a new classifier.
    pub fn new(embedder: Arc<dyn EmbeddingModel>) -> Result<Self, ClassifierError> {
        let mut industry_prototypes = Vec::with_capacity(Industry::CLASSIFIED.len());
        for industry in Industry::CLASSIFIED {
            let bag = industry.keywords().join(" ");
            industry_prototypes.push((industry, embedder.embed(&bag)?));
        }

        let mut type_prototypes = HashMap::with_capacity(RecordType::ALL.len());
        for record_type in RecordType::ALL {
            type_prototypes.insert(record_type, embedder.embed(record_type.description())?);
        }

        Ok(Self {
            embedder,
            industry_prototypes,
            type_prototypes,
        })
    }

    /// Classify the industry of a page from its text content.
    ///
    /// Scores the first 1000 chars against each classified industry's
    /// keyword-bag prototype. A candidate must beat the running best
    /// strictly, so text with zero similarity everywhere stays `General`.
    pub fn classify_industry(&self, text: &str) -> Result<Industry, ClassifierError> {
        let sample = char_prefix(text, CLASSIFY_PREFIX_CHARS);
        if sample.is_empty() {
            return Ok(Industry::General);
        }
        let embedding = self.embedder.embed(sample)?;

        let mut best = Industry::General;
        let mut best_score = 0.0f32;
        for (industry, prototype) in &self.industry_prototypes {
            let score = cosine_similarity(&embedding, prototype);
            if score > best_score {
                best = *industry;
                best_score = score;
            }
        }

        debug!(industry = %best, score = best_score, "classified industry");
        Ok(best)
    }

    /// Pick the record type for a page, restricted to the industry's
    /// registered vocabulary.
    ///
    /// The first registered candidate is the default; later candidates must
    /// win strictly, so ties keep the earlier one.
    pub fn detect_record_type(
        &self,
        text: &str,
        industry: Industry,
    ) -> Result<RecordType, ClassifierError> {
        let candidates = industry.record_types();
        let sample = char_prefix(text, CLASSIFY_PREFIX_CHARS);
        if sample.is_empty() {
            return Ok(candidates[0]);
        }
        let embedding = self.embedder.embed(sample)?;

        let mut best = candidates[0];
        let mut best_score = f32::NEG_INFINITY;
        for candidate in candidates {
            // Prototypes cover RecordType::ALL, so the lookup cannot miss
            let prototype = &self.type_prototypes[candidate];
            let score = cosine_similarity(&embedding, prototype);
            if score > best_score {
                best = *candidate;
                best_score = score;
            }
        }

        debug!(record_type = %best, score = best_score, "detected record type");
        Ok(best)
    }
}

/// Longest prefix of `text` holding at most `max_chars` chars, cut on a char
/// boundary.
fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
