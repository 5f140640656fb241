use candle_core::{D, Tensor};

use crate::constants::POSITIVE_CLASS_INDEX;
use crate::model::{ModelError, ScoreTrace};

use super::error::ScoringError;

/// `(batch, class_count)` log-probabilities returned by
/// [`PairScorer::score`](super::PairScorer::score).
#[derive(Debug, Clone)]
pub struct ScoreOutput {
    log_probs: Tensor,
}

impl ScoreOutput {
    pub(crate) fn new(log_probs: Tensor) -> Self {
        Self { log_probs }
    }

    /// Raw log-probability tensor.
    pub fn log_probs(&self) -> &Tensor {
        &self.log_probs
    }

    pub fn batch_size(&self) -> usize {
        self.log_probs.dims()[0]
    }

    pub fn class_count(&self) -> usize {
        self.log_probs.dims()[1]
    }

    pub fn to_vec2(&self) -> Result<Vec<Vec<f32>>, ScoringError> {
        Ok(self.log_probs.to_vec2::<f32>().map_err(ModelError::from)?)
    }

    /// `exp` of the log-probabilities; each row sums to one.
    pub fn probabilities(&self) -> Result<Vec<Vec<f32>>, ScoringError> {
        let probs = self.log_probs.exp().map_err(ModelError::from)?;
        Ok(probs.to_vec2::<f32>().map_err(ModelError::from)?)
    }

    /// Arg-max class per row.
    pub fn predictions(&self) -> Result<Vec<usize>, ScoringError> {
        let argmax = self
            .log_probs
            .argmax(D::Minus1)
            .and_then(|t| t.to_vec1::<u32>())
            .map_err(ModelError::from)?;
        Ok(argmax.into_iter().map(|c| c as usize).collect())
    }

    /// Probability of the relevant-answer class per row.
    pub fn positive_scores(&self) -> Result<Vec<f32>, ScoringError> {
        Ok(self
            .probabilities()?
            .into_iter()
            .map(|row| row.get(POSITIVE_CLASS_INDEX).copied().unwrap_or(0.0))
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
/// One candidate answer after ranking.
pub struct RankedAnswer {
    /// Position of the candidate in the input list.
    pub index: usize,
    /// Probability of the relevant-answer class.
    pub score: f32,
}

impl RankedAnswer {
    pub fn new(index: usize, score: f32) -> Self {
        Self { index, score }
    }
}

/// Output and per-layer shapes of a traced call.
#[derive(Debug, Clone)]
pub struct TracedScore {
    pub output: ScoreOutput,
    pub trace: ScoreTrace,
}
