use std::cmp::Ordering;
use std::path::PathBuf;

use candle_core::Device;
use tracing::{debug, info};

use crate::model::{
    AuxFeatures, ExecutionMode, ModelConfig, ModelLoader, ModelParameters, SmCnn, TokenMatrix,
};

use super::error::ScoringError;
use super::types::{RankedAnswer, ScoreOutput, TracedScore};

enum ScorerState {
    Unloaded,
    Ready(SmCnn),
}

/// Scores (question, answer, auxiliary features) triples.
///
/// Starts either `Unloaded` ([`PairScorer::unloaded`]) or `Ready` ([`PairScorer::load`],
/// [`PairScorer::from_parameters`]). A ready scorer holds no mutable state: the execution mode is
/// passed on every call.
pub struct PairScorer {
    state: ScorerState,
}

impl std::fmt::Debug for PairScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("PairScorer");
        match &self.state {
            ScorerState::Unloaded => s.field("state", &"Unloaded"),
            ScorerState::Ready(model) => s
                .field("state", &"Ready")
                .field("device", &format!("{:?}", model.device()))
                .field("config", model.config()),
        }
        .finish()
    }
}

impl Default for PairScorer {
    fn default() -> Self {
        Self::unloaded()
    }
}

impl PairScorer {
    pub fn unloaded() -> Self {
        Self {
            state: ScorerState::Unloaded,
        }
    }

    /// Reads a model directory (see [`ModelLoader`]) onto `device`.
    pub fn load<P: Into<PathBuf>>(model_dir: P, device: &Device) -> Result<Self, ScoringError> {
        let loader = ModelLoader::new(model_dir);
        let params = loader.load(device)?;
        Self::from_parameters(params)
    }

    pub fn from_parameters(params: ModelParameters) -> Result<Self, ScoringError> {
        Ok(Self::from_model(SmCnn::new(params)?))
    }

    /// Wraps a network built elsewhere (e.g. with custom strategies).
    pub fn from_model(model: SmCnn) -> Self {
        info!(
            channel_count = model.config().channel_count,
            hidden_width = model.config().hidden_width(),
            activation = model.activation().name(),
            regularizer = model.regularizer().name(),
            "Pair scorer ready"
        );
        Self {
            state: ScorerState::Ready(model),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ScorerState::Ready(_))
    }

    pub fn model(&self) -> Option<&SmCnn> {
        match &self.state {
            ScorerState::Ready(model) => Some(model),
            ScorerState::Unloaded => None,
        }
    }

    pub fn config(&self) -> Option<&ModelConfig> {
        self.model().map(SmCnn::config)
    }

    fn ready_model(&self) -> Result<&SmCnn, ScoringError> {
        self.model().ok_or_else(|| ScoringError::NotLoaded {
            reason: "no model parameters are bound; load a model first".to_string(),
        })
    }

    /// Returns `(batch, class_count)` log-probabilities.
    pub fn score(
        &self,
        question: &TokenMatrix,
        answer: &TokenMatrix,
        aux: Option<&AuxFeatures>,
        mode: ExecutionMode,
    ) -> Result<ScoreOutput, ScoringError> {
        let model = self.ready_model()?;
        let log_probs = model.forward(question, answer, aux, mode)?;
        Ok(ScoreOutput::new(log_probs))
    }

    /// Like [`PairScorer::score`], also returning the shape after every layer.
    pub fn score_traced(
        &self,
        question: &TokenMatrix,
        answer: &TokenMatrix,
        aux: Option<&AuxFeatures>,
        mode: ExecutionMode,
    ) -> Result<TracedScore, ScoringError> {
        let model = self.ready_model()?;
        let (log_probs, trace) = model.forward_traced(question, answer, aux, mode)?;
        Ok(TracedScore {
            output: ScoreOutput::new(log_probs),
            trace,
        })
    }

    /// Scores each candidate against one question (inference mode) and sorts by the
    /// relevant-class probability, best first.
    ///
    /// `aux`, when given, holds one single-row feature vector per candidate.
    pub fn rank(
        &self,
        question: &TokenMatrix,
        answers: &[TokenMatrix],
        aux: Option<&[AuxFeatures]>,
    ) -> Result<Vec<RankedAnswer>, ScoringError> {
        self.ready_model()?;

        if question.batch_size() != 1 {
            return Err(ScoringError::InvalidInput {
                reason: format!(
                    "rank expects a single question, got batch of {}",
                    question.batch_size()
                ),
            });
        }
        if let Some(aux) = aux
            && aux.len() != answers.len()
        {
            return Err(ScoringError::InvalidInput {
                reason: format!(
                    "{} candidates but {} auxiliary feature rows",
                    answers.len(),
                    aux.len()
                ),
            });
        }

        debug!(num_candidates = answers.len(), "Ranking candidate answers");

        let mut ranked = answers
            .iter()
            .enumerate()
            .map(|(idx, answer)| {
                let features = aux.map(|rows| &rows[idx]);
                let output = self.score(question, answer, features, ExecutionMode::Inference)?;
                let score = output.positive_scores()?.first().copied().unwrap_or(0.0);
                Ok(RankedAnswer::new(idx, score))
            })
            .collect::<Result<Vec<_>, ScoringError>>()?;

        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        debug!(
            top_score = ranked.first().map(|r| r.score),
            "Ranking complete"
        );

        Ok(ranked)
    }
}
