//! Auxiliary word-overlap features for a (question, answer) pair.
//!
//! Four values per pair, in this order:
//! 1. word overlap: `|Q ∩ A| / (|Q| + |A|)` over token sets
//! 2. IDF-weighted overlap: `Σ idf(w) for w in Q ∩ A`, same denominator
//! 3. word overlap with stop words removed
//! 4. IDF-weighted overlap with stop words removed
//!
//! Empty token sets yield 0.

use std::collections::{HashMap, HashSet};

use candle_core::Device;
use tracing::debug;

use crate::constants::OVERLAP_FEATURE_COUNT;
use crate::model::{AuxFeatures, ModelResult};


/// Function words ignored by the stop-word variants.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "can", "to", "of", "in", "for", "on", "with", "at", "by", "from", "as", "into", "through",
    "during", "before", "after", "above", "below", "between", "under", "again", "further",
    "then", "once", "here", "there", "when", "where", "why", "how", "all", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "just", "and", "but", "if", "or", "because", "until", "while", "what",
    "which", "who", "whom", "this", "that", "these", "those", "am", "it", "its",
];

/// Case-insensitive stop-word check.
pub fn is_stop_word(token: &str) -> bool {
    let lower = token.to_lowercase();
    STOP_WORDS.contains(&lower.as_str())
}

/// Inverse document frequencies, `ln(N / df)`.
#[derive(Debug, Clone, Default)]
pub struct IdfTable {
    document_count: usize,
    weights: HashMap<String, f32>,
}

impl IdfTable {
    /// A table with no documents: every word weighs 0.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Counts each token at most once per document.
    pub fn from_documents<I>(documents: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoIterator,
        <I::Item as IntoIterator>::Item: AsRef<str>,
    {
        let mut document_count = 0usize;
        let mut frequencies: HashMap<String, usize> = HashMap::new();

        for document in documents {
            document_count += 1;
            let unique: HashSet<String> = document
                .into_iter()
                .map(|token| token.as_ref().to_string())
                .collect();
            for token in unique {
                *frequencies.entry(token).or_insert(0) += 1;
            }
        }

        let weights = frequencies
            .into_iter()
            .map(|(token, df)| {
                let idf = (document_count as f32 / df as f32).ln();
                (token, idf)
            })
            .collect::<HashMap<_, _>>();

        debug!(
            document_count,
            vocab_size = weights.len(),
            "IDF table built"
        );

        Self {
            document_count,
            weights,
        }
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Returns 0 for words never seen.
    pub fn idf(&self, token: &str) -> f32 {
        self.weights.get(token).copied().unwrap_or(0.0)
    }
}

/// Overlap features for one pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverlapFeatures {
    pub overlap: f32,
    pub idf_overlap: f32,
    pub overlap_no_stop: f32,
    pub idf_overlap_no_stop: f32,
}

impl OverlapFeatures {
    pub fn compute<Q, A>(question: &[Q], answer: &[A], idf: &IdfTable) -> Self
    where
        Q: AsRef<str>,
        A: AsRef<str>,
    {
        let q_set: HashSet<&str> = question.iter().map(AsRef::as_ref).collect();
        let a_set: HashSet<&str> = answer.iter().map(AsRef::as_ref).collect();
        let (overlap, idf_overlap) = set_overlap(&q_set, &a_set, idf);

        let q_content = without_stop_words(&q_set);
        let a_content = without_stop_words(&a_set);
        let (overlap_no_stop, idf_overlap_no_stop) = set_overlap(&q_content, &a_content, idf);

        Self {
            overlap,
            idf_overlap,
            overlap_no_stop,
            idf_overlap_no_stop,
        }
    }

    pub fn to_array(&self) -> [f32; OVERLAP_FEATURE_COUNT] {
        [
            self.overlap,
            self.idf_overlap,
            self.overlap_no_stop,
            self.idf_overlap_no_stop,
        ]
    }

    /// Single-row `(1, 4)` auxiliary features.
    pub fn to_aux(&self, device: &Device) -> ModelResult<AuxFeatures> {
        AuxFeatures::from_slice(&self.to_array(), device)
    }
}

/// Stacks one row per pair into a `(batch, 4)` auxiliary-feature matrix.
pub fn batch_aux(features: &[OverlapFeatures], device: &Device) -> ModelResult<AuxFeatures> {
    let rows: Vec<Vec<f32>> = features.iter().map(|f| f.to_array().to_vec()).collect();
    AuxFeatures::from_rows(&rows, device)
}

fn without_stop_words<'a>(tokens: &HashSet<&'a str>) -> HashSet<&'a str> {
    tokens.iter().copied().filter(|t| !is_stop_word(t)).collect()
}

fn set_overlap(question: &HashSet<&str>, answer: &HashSet<&str>, idf: &IdfTable) -> (f32, f32) {
    if question.is_empty() || answer.is_empty() {
        return (0.0, 0.0);
    }
    let denominator = (question.len() + answer.len()) as f32;

    let shared: Vec<&str> = question.intersection(answer).copied().collect();
    let weighted: f32 = shared.iter().map(|t| idf.idf(t)).sum();

    (shared.len() as f32 / denominator, weighted / denominator)
}
