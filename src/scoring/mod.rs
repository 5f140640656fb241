//! Question/answer pair scoring.
//!
//! [`PairScorer`] wraps a loaded [`SmCnn`](crate::model::SmCnn) and exposes:
//!
//! - [`PairScorer::score`]: `(batch, class_count)` log-probabilities for a batch of pairs.
//! - [`PairScorer::score_traced`]: the same, plus the tensor shape after every layer.
//! - [`PairScorer::rank`]: answer selection over a list of candidates for one question.
//!
//! # States
//!
//! A scorer is either `Unloaded` or `Ready`. Scoring an unloaded scorer fails with
//! [`ScoringError::NotLoaded`]; a ready scorer never changes again. The training/inference switch
//! is the [`ExecutionMode`](crate::model::ExecutionMode) argument, not scorer state, so a single
//! `Arc<PairScorer>` can serve concurrent callers.

pub mod error;
pub mod scorer;
pub mod types;


pub use error::ScoringError;
pub use scorer::PairScorer;
pub use types::{RankedAnswer, ScoreOutput, TracedScore};
