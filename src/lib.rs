//! SM CNN answer-selection scorer.
//!
//! Scores how well a candidate answer sentence answers a question: both sentences are convolved
//! and max-pooled into fixed-length vectors, concatenated with word-overlap features, projected,
//! and classified into log-probabilities over relevance classes.
//!
//! # Public API Surface
//!
//! ## Scoring
//! - [`PairScorer`] - load a model and score or rank (question, answer) pairs
//! - [`ScoreOutput`], [`RankedAnswer`], [`TracedScore`] - results
//!
//! ## Model
//! - [`SmCnn`], [`ModelParameters`], [`ModelConfig`], [`ModelLoader`] - network and persistence
//! - [`TokenMatrix`], [`AuxFeatures`] - inputs
//! - [`Activation`], [`Regularizer`], [`ExecutionMode`] - pluggable strategies
//!
//! ## Inputs
//! - [`WordVectors`], [`SentenceEncoder`] - sentences to token matrices
//! - [`OverlapFeatures`], [`IdfTable`] - auxiliary features
//!
//! ## Configuration
//! - [`Config`] - `SMCNN_*` environment settings for the binary

pub mod config;
pub mod constants;
pub mod embedding;
pub mod features;
pub mod model;
pub mod scoring;

pub use config::{Config, ConfigError};
pub use embedding::{
    DevicePreference, EmbeddingError, EncoderConfig, SentenceEncoder, WordVectors, select_device,
    tokenize,
};
pub use features::{IdfTable, OverlapFeatures, batch_aux};
pub use model::{
    Activation, ActivationKind, AuxFeatures, Dropout, ExecutionMode, ModelConfig, ModelError,
    ModelLoader, ModelParameters, NoRegularization, Regularizer, ScoreTrace, SmCnn, Softsign,
    Tanh, TokenMatrix,
};
pub use scoring::{PairScorer, RankedAnswer, ScoreOutput, ScoringError, TracedScore};
