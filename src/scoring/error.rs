use thiserror::Error;

use crate::model::ModelError;

#[derive(Debug, Error)]
pub enum ScoringError {
    /// `score` was called on a scorer with no parameters bound.
    #[error("scorer not loaded: {reason}")]
    NotLoaded { reason: String },

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
}

impl ScoringError {
    /// Shape or length problems with the caller's tensors.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            ScoringError::InvalidInput { .. } | ScoringError::Model(ModelError::InvalidInput { .. })
        )
    }

    /// Auxiliary features mismatched against the model configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ScoringError::Model(ModelError::Configuration { .. }))
    }

    pub fn is_corrupt_model(&self) -> bool {
        matches!(self, ScoringError::Model(ModelError::CorruptModel { .. }))
    }

    pub fn is_not_loaded(&self) -> bool {
        matches!(self, ScoringError::NotLoaded { .. })
    }
}
