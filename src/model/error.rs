use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// Input tensors disagree with each other or with the model (batch, rank, width, length).
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Auxiliary features present/absent or sized against the model configuration.
    #[error("configuration mismatch: {reason}")]
    Configuration { reason: String },

    /// Persisted parameters are internally inconsistent or incomplete.
    #[error("corrupt model: {reason}")]
    CorruptModel { reason: String },

    #[error("model not found at path: {path}")]
    ModelNotFound { path: PathBuf },

    #[error("model inference failed: {reason}")]
    Inference { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModelError {
    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        ModelError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        ModelError::Configuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        ModelError::CorruptModel {
            reason: reason.into(),
        }
    }
}

impl From<candle_core::Error> for ModelError {
    fn from(err: candle_core::Error) -> Self {
        ModelError::Inference {
            reason: err.to_string(),
        }
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
