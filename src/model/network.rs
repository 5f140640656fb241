//! The SM CNN forward pass.

use std::sync::Arc;

use candle_core::{D, Device, Tensor};
use candle_nn::{Linear, Module};
use tracing::debug;

use super::activation::Activation;
use super::branch::{BranchTrace, ConvolutionBranch};
use super::config::ModelConfig;
use super::error::{ModelError, ModelResult};
use super::input::{AuxFeatures, TokenMatrix};
use super::params::ModelParameters;
use super::regularizer::{Dropout, ExecutionMode, Regularizer};

/// Shapes recorded at each step of a forward pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreTrace {
    pub question: BranchTrace,
    pub answer: BranchTrace,
    pub combined: Vec<usize>,
    pub projected: Vec<usize>,
    pub logits: Vec<usize>,
    pub output: Vec<usize>,
}

/// Two convolution branches, a projection, a classifier and log-softmax.
///
/// Immutable after construction; `forward` may be called concurrently from several threads.
#[derive(Debug, Clone)]
pub struct SmCnn {
    config: ModelConfig,
    question_branch: ConvolutionBranch,
    answer_branch: ConvolutionBranch,
    combined_feature_vector: Linear,
    hidden: Linear,
    activation: Arc<dyn Activation>,
    regularizer: Arc<dyn Regularizer>,
    device: Device,
}

impl SmCnn {
    /// Builds the network with the activation named in the config and dropout at
    /// `config.dropout`.
    pub fn new(params: ModelParameters) -> ModelResult<Self> {
        let config = params.config().clone();
        let activation = config.activation.build();
        let regularizer: Arc<dyn Regularizer> = Arc::new(Dropout::new(config.dropout)?);
        let device = params.device().clone();

        let question_branch = ConvolutionBranch::new(
            "question",
            params.question_conv().weight.clone(),
            params.question_conv().bias.clone(),
            activation.clone(),
        )?;
        let answer_branch = ConvolutionBranch::new(
            "answer",
            params.answer_conv().weight.clone(),
            params.answer_conv().bias.clone(),
            activation.clone(),
        )?;

        let combined_feature_vector = Linear::new(
            params.projection().weight.clone(),
            Some(params.projection().bias.clone()),
        );
        let hidden = Linear::new(
            params.classifier().weight.clone(),
            Some(params.classifier().bias.clone()),
        );

        Ok(Self {
            config,
            question_branch,
            answer_branch,
            combined_feature_vector,
            hidden,
            activation,
            regularizer,
            device,
        })
    }

    /// Replaces the nonlinearity everywhere it is used (both branches and after projection).
    pub fn with_activation(mut self, activation: Arc<dyn Activation>) -> Self {
        self.question_branch = self.question_branch.with_activation(activation.clone());
        self.answer_branch = self.answer_branch.with_activation(activation.clone());
        self.activation = activation;
        self
    }

    pub fn with_regularizer(mut self, regularizer: Arc<dyn Regularizer>) -> Self {
        self.regularizer = regularizer;
        self
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn activation(&self) -> &Arc<dyn Activation> {
        &self.activation
    }

    pub fn regularizer(&self) -> &Arc<dyn Regularizer> {
        &self.regularizer
    }

    pub fn question_branch(&self) -> &ConvolutionBranch {
        &self.question_branch
    }

    pub fn answer_branch(&self) -> &ConvolutionBranch {
        &self.answer_branch
    }

    /// Returns `(batch, class_count)` log-probabilities.
    pub fn forward(
        &self,
        question: &TokenMatrix,
        answer: &TokenMatrix,
        aux: Option<&AuxFeatures>,
        mode: ExecutionMode,
    ) -> ModelResult<Tensor> {
        self.run(question, answer, aux, mode, None)
    }

    pub fn forward_traced(
        &self,
        question: &TokenMatrix,
        answer: &TokenMatrix,
        aux: Option<&AuxFeatures>,
        mode: ExecutionMode,
    ) -> ModelResult<(Tensor, ScoreTrace)> {
        let mut trace = ScoreTrace::default();
        let output = self.run(question, answer, aux, mode, Some(&mut trace))?;
        Ok((output, trace))
    }

    /// Checks auxiliary-feature presence and width against the config.
    pub fn check_aux(&self, aux: Option<&AuxFeatures>) -> ModelResult<()> {
        match (self.config.use_aux_features, aux) {
            (true, None) => Err(ModelError::configuration(format!(
                "model expects {} auxiliary features but none were given",
                self.config.aux_feature_count
            ))),
            (false, Some(_)) => Err(ModelError::configuration(
                "model was configured without auxiliary features but some were given",
            )),
            (true, Some(aux)) if aux.feature_count() != self.config.aux_feature_count => {
                Err(ModelError::configuration(format!(
                    "model expects {} auxiliary features, got {}",
                    self.config.aux_feature_count,
                    aux.feature_count()
                )))
            }
            _ => Ok(()),
        }
    }

    fn check_batches(
        &self,
        question: &TokenMatrix,
        answer: &TokenMatrix,
        aux: Option<&AuxFeatures>,
    ) -> ModelResult<usize> {
        let batch = question.batch_size();
        if batch == 0 {
            return Err(ModelError::invalid_input("batch is empty"));
        }
        if answer.batch_size() != batch {
            return Err(ModelError::invalid_input(format!(
                "question batch is {}, answer batch is {}",
                batch,
                answer.batch_size()
            )));
        }
        if let Some(aux) = aux
            && aux.batch_size() != batch
        {
            return Err(ModelError::invalid_input(format!(
                "question batch is {}, aux feature batch is {}",
                batch,
                aux.batch_size()
            )));
        }
        Ok(batch)
    }

    fn run(
        &self,
        question: &TokenMatrix,
        answer: &TokenMatrix,
        aux: Option<&AuxFeatures>,
        mode: ExecutionMode,
        trace: Option<&mut ScoreTrace>,
    ) -> ModelResult<Tensor> {
        self.check_aux(aux)?;
        let batch = self.check_batches(question, answer, aux)?;

        let (q_vec, q_trace) = self.question_branch.forward_traced(question)?;
        let (a_vec, a_trace) = self.answer_branch.forward_traced(answer)?;

        let aux_tensor = aux
            .map(|a| a.tensor().to_device(&self.device))
            .transpose()?;
        let mut parts = vec![&q_vec, &a_vec];
        if let Some(ref aux_tensor) = aux_tensor {
            parts.push(aux_tensor);
        }
        let combined = Tensor::cat(&parts, 1)?;

        let width = combined.dim(1)?;
        if width != self.config.concat_width() {
            return Err(ModelError::configuration(format!(
                "concatenated width is {}, projection layer expects {}",
                width,
                self.config.concat_width()
            )));
        }

        let projected = self.combined_feature_vector.forward(&combined)?;
        let activated = self.activation.apply(&projected)?;
        let regularized = self.regularizer.apply(&activated, mode)?;
        let logits = self.hidden.forward(&regularized)?;
        let output = candle_nn::ops::log_softmax(&logits, D::Minus1)?;

        debug!(
            batch,
            mode = ?mode,
            combined = ?combined.dims(),
            projected = ?projected.dims(),
            logits = ?logits.dims(),
            "SM CNN forward"
        );

        if let Some(trace) = trace {
            *trace = ScoreTrace {
                question: q_trace,
                answer: a_trace,
                combined: combined.dims().to_vec(),
                projected: projected.dims().to_vec(),
                logits: logits.dims().to_vec(),
                output: output.dims().to_vec(),
            };
        }

        Ok(output)
    }
}
