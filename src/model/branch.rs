//! One convolution + global max-pooling tower.

use std::sync::Arc;

use candle_core::{Device, Tensor};
use candle_nn::{Conv1d, Conv1dConfig, Module};
use tracing::debug;

use super::activation::Activation;
use super::error::{ModelError, ModelResult};
use super::input::TokenMatrix;

/// Shapes recorded at each step of [`ConvolutionBranch::forward_traced`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchTrace {
    pub input: Vec<usize>,
    pub convolved: Vec<usize>,
    pub pooled: Vec<usize>,
    pub flattened: Vec<usize>,
}

/// Summarizes a `(B, D, L)` token matrix into a `(B, C)` vector.
///
/// The sequence axis is padded by `filter_width - 1` on both sides, so any `L >= 1` is
/// convolvable and the convolution output has `L + filter_width - 1` positions before pooling.
#[derive(Debug, Clone)]
pub struct ConvolutionBranch {
    name: &'static str,
    conv: Conv1d,
    activation: Arc<dyn Activation>,
    embedding_dim: usize,
    channel_count: usize,
    filter_width: usize,
}

impl ConvolutionBranch {
    /// `weight` is `(C, D, W)`, `bias` is `(C)`; shapes are checked by the parameter loader.
    pub fn new(
        name: &'static str,
        weight: Tensor,
        bias: Tensor,
        activation: Arc<dyn Activation>,
    ) -> ModelResult<Self> {
        let (channel_count, embedding_dim, filter_width) = weight.dims3()?;
        if filter_width == 0 {
            return Err(ModelError::corrupt(format!("{name} filter width is 0")));
        }
        let config = Conv1dConfig {
            padding: filter_width - 1,
            ..Default::default()
        };

        Ok(Self {
            name,
            conv: Conv1d::new(weight, Some(bias), config),
            activation,
            embedding_dim,
            channel_count,
            filter_width,
        })
    }

    pub fn with_activation(mut self, activation: Arc<dyn Activation>) -> Self {
        self.activation = activation;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn filter_width(&self) -> usize {
        self.filter_width
    }

    pub fn device(&self) -> &Device {
        self.conv.weight().device()
    }

    pub fn forward(&self, input: &TokenMatrix) -> ModelResult<Tensor> {
        self.forward_traced(input).map(|(out, _)| out)
    }

    pub fn forward_traced(&self, input: &TokenMatrix) -> ModelResult<(Tensor, BranchTrace)> {
        let batch = input.batch_size();
        let seq_len = input.seq_len();

        if batch == 0 {
            return Err(ModelError::invalid_input(format!(
                "{} batch is empty",
                self.name
            )));
        }
        if seq_len == 0 {
            return Err(ModelError::invalid_input(format!(
                "{} sentence has zero length",
                self.name
            )));
        }
        if input.embedding_dim() != self.embedding_dim {
            return Err(ModelError::invalid_input(format!(
                "{} embedding dim is {}, model expects {}",
                self.name,
                input.embedding_dim(),
                self.embedding_dim
            )));
        }

        let xs = input.tensor().to_device(self.device())?.contiguous()?;

        let convolved = self.activation.apply(&self.conv.forward(&xs)?)?;
        let pooled = convolved.max_keepdim(2)?;
        let flattened = pooled.reshape((batch, self.channel_count))?;

        let trace = BranchTrace {
            input: input.tensor().dims().to_vec(),
            convolved: convolved.dims().to_vec(),
            pooled: pooled.dims().to_vec(),
            flattened: flattened.dims().to_vec(),
        };

        debug!(
            branch = self.name,
            input = ?trace.input,
            convolved = ?trace.convolved,
            pooled = ?trace.pooled,
            flattened = ?trace.flattened,
            "Convolution branch forward"
        );

        Ok((flattened, trace))
    }
}
