use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("word vector file not found at path: {path}")]
    VectorsNotFound { path: PathBuf },

    #[error("invalid word vector file at line {line}: {reason}")]
    InvalidVectors { line: usize, reason: String },

    #[error("{device} device unavailable: {reason}")]
    DeviceUnavailable { device: String, reason: String },

    #[error("tokenization failed: {reason}")]
    TokenizationFailed { reason: String },

    #[error("sentence has no tokens after tokenization")]
    EmptySentence,

    #[error("failed to build token matrix: {reason}")]
    TensorFailed { reason: String },

    #[error("invalid encoder configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("invalid token matrix: {0}")]
    Matrix(#[from] crate::model::ModelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<candle_core::Error> for EmbeddingError {
    fn from(err: candle_core::Error) -> Self {
        EmbeddingError::TensorFailed {
            reason: err.to_string(),
        }
    }
}
