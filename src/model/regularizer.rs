//! Stochastic regularization applied to the hidden vector.

use candle_core::{Result, Tensor};

use super::error::{ModelError, ModelResult};

/// Whether a forward pass is part of training or inference.
///
/// Passed explicitly on every call; the scorer keeps no mode state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Inference,
    Training,
}

impl ExecutionMode {
    pub fn is_training(self) -> bool {
        matches!(self, ExecutionMode::Training)
    }
}

pub trait Regularizer: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Must be the identity when `mode` is [`ExecutionMode::Inference`].
    fn apply(&self, xs: &Tensor, mode: ExecutionMode) -> Result<Tensor>;
}

/// Inverted dropout: in training, zero each element with `probability` and scale survivors by
/// `1 / (1 - probability)`.
#[derive(Debug, Clone, Copy)]
pub struct Dropout {
    probability: f32,
}

impl Dropout {
    pub fn new(probability: f32) -> ModelResult<Self> {
        if !(0.0..1.0).contains(&probability) {
            return Err(ModelError::configuration(format!(
                "dropout probability must be in [0.0, 1.0), got {}",
                probability
            )));
        }
        Ok(Self { probability })
    }

    pub fn probability(&self) -> f32 {
        self.probability
    }
}

impl Regularizer for Dropout {
    fn name(&self) -> &'static str {
        "dropout"
    }

    fn apply(&self, xs: &Tensor, mode: ExecutionMode) -> Result<Tensor> {
        if !mode.is_training() || self.probability == 0.0 {
            return Ok(xs.clone());
        }
        candle_nn::ops::dropout(xs, self.probability)
    }
}

/// Identity in both modes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRegularization;

impl Regularizer for NoRegularization {
    fn name(&self) -> &'static str {
        "none"
    }

    fn apply(&self, xs: &Tensor, _mode: ExecutionMode) -> Result<Tensor> {
        Ok(xs.clone())
    }
}
