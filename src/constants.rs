//! Cross-cutting, shared constants.
//!
//! The `REFERENCE_*` values describe the reference TrecQA configuration (50-d word vectors,
//! 100 filters of width 5, four overlap features, binary relevance). They are the defaults for
//! [`ModelConfig`](crate::model::ModelConfig) and for the seeded demo model.

pub const REFERENCE_EMBEDDING_DIM: usize = 50;
pub const REFERENCE_FILTER_WIDTH: usize = 5;
pub const REFERENCE_CHANNEL_COUNT: usize = 100;
pub const REFERENCE_AUX_FEATURE_COUNT: usize = 4;
pub const REFERENCE_CLASS_COUNT: usize = 2;

pub const DEFAULT_DROPOUT: f32 = 0.5;

/// Index of the "answer is relevant" class in the model output.
pub const POSITIVE_CLASS_INDEX: usize = 1;

/// Unknown words get vectors drawn uniformly from `[-UNKNOWN_WORD_RANGE, UNKNOWN_WORD_RANGE]`.
pub const UNKNOWN_WORD_RANGE: f32 = 0.25;

pub const DEFAULT_MAX_SEQ_LEN: usize = 60;

/// Current on-disk parameter layout version.
pub const MODEL_FORMAT_VERSION: u32 = 1;

pub const MODEL_CONFIG_FILENAME: &str = "config.json";
pub const MODEL_WEIGHTS_FILENAME: &str = "model.safetensors";

/// Number of overlap features produced by [`OverlapFeatures`](crate::features::OverlapFeatures).
pub const OVERLAP_FEATURE_COUNT: usize = 4;

/// Tolerance used when checking that probabilities sum to one.
pub const PROBABILITY_TOLERANCE: f32 = 1e-5;
