//! Learned tensors plus the hyperparameters that shape them.

use std::collections::HashMap;

use candle_core::{DType, Device, Tensor};
use tracing::debug;

use super::config::ModelConfig;
use super::error::{ModelError, ModelResult};

pub const QUESTION_CONV_WEIGHT: &str = "conv_q.weight";
pub const QUESTION_CONV_BIAS: &str = "conv_q.bias";
pub const ANSWER_CONV_WEIGHT: &str = "conv_a.weight";
pub const ANSWER_CONV_BIAS: &str = "conv_a.bias";
pub const PROJECTION_WEIGHT: &str = "combined_feature_vector.weight";
pub const PROJECTION_BIAS: &str = "combined_feature_vector.bias";
pub const CLASSIFIER_WEIGHT: &str = "hidden.weight";
pub const CLASSIFIER_BIAS: &str = "hidden.bias";

pub const TENSOR_NAMES: [&str; 8] = [
    QUESTION_CONV_WEIGHT,
    QUESTION_CONV_BIAS,
    ANSWER_CONV_WEIGHT,
    ANSWER_CONV_BIAS,
    PROJECTION_WEIGHT,
    PROJECTION_BIAS,
    CLASSIFIER_WEIGHT,
    CLASSIFIER_BIAS,
];

/// Weight and bias of one layer.
#[derive(Debug, Clone)]
pub struct LayerWeights {
    pub weight: Tensor,
    pub bias: Tensor,
}

/// Complete, shape-checked parameter set. Read-only once built.
///
/// Convolution weights are `(C, D, W)`; affine weights are `(out, in)`.
#[derive(Debug, Clone)]
pub struct ModelParameters {
    config: ModelConfig,
    question_conv: LayerWeights,
    answer_conv: LayerWeights,
    projection: LayerWeights,
    classifier: LayerWeights,
}

impl ModelParameters {
    /// Validates `tensors` against `config` and against each other.
    ///
    /// Every inconsistency is reported as [`ModelError::CorruptModel`].
    pub fn from_tensors(
        config: ModelConfig,
        mut tensors: HashMap<String, Tensor>,
    ) -> ModelResult<Self> {
        config.validate().map_err(ModelError::corrupt)?;

        let mut take = |name: &str| -> ModelResult<Tensor> {
            let tensor = tensors
                .remove(name)
                .ok_or_else(|| ModelError::corrupt(format!("missing tensor '{name}'")))?;
            Ok(tensor.to_dtype(DType::F32)?)
        };

        let question_conv = LayerWeights {
            weight: take(QUESTION_CONV_WEIGHT)?,
            bias: take(QUESTION_CONV_BIAS)?,
        };
        let answer_conv = LayerWeights {
            weight: take(ANSWER_CONV_WEIGHT)?,
            bias: take(ANSWER_CONV_BIAS)?,
        };
        let projection = LayerWeights {
            weight: take(PROJECTION_WEIGHT)?,
            bias: take(PROJECTION_BIAS)?,
        };
        let classifier = LayerWeights {
            weight: take(CLASSIFIER_WEIGHT)?,
            bias: take(CLASSIFIER_BIAS)?,
        };

        if !tensors.is_empty() {
            let mut extra: Vec<_> = tensors.keys().cloned().collect();
            extra.sort();
            debug!(?extra, "Ignoring unrecognized tensors in parameter blob");
        }

        let params = Self {
            config,
            question_conv,
            answer_conv,
            projection,
            classifier,
        };
        params.check_shapes()?;
        Ok(params)
    }

    fn check_shapes(&self) -> ModelResult<()> {
        let q_channels = conv_channels(QUESTION_CONV_WEIGHT, &self.question_conv.weight)?;
        let a_channels = conv_channels(ANSWER_CONV_WEIGHT, &self.answer_conv.weight)?;
        if q_channels != a_channels {
            return Err(ModelError::corrupt(format!(
                "convolution branches disagree on channel count: question {}, answer {}",
                q_channels, a_channels
            )));
        }

        let cfg = &self.config;
        let conv_shape = [cfg.channel_count, cfg.embedding_dim, cfg.filter_width];
        expect_shape(QUESTION_CONV_WEIGHT, &self.question_conv.weight, &conv_shape)?;
        expect_shape(QUESTION_CONV_BIAS, &self.question_conv.bias, &[cfg.channel_count])?;
        expect_shape(ANSWER_CONV_WEIGHT, &self.answer_conv.weight, &conv_shape)?;
        expect_shape(ANSWER_CONV_BIAS, &self.answer_conv.bias, &[cfg.channel_count])?;

        let hidden = cfg.hidden_width();
        expect_shape(
            PROJECTION_WEIGHT,
            &self.projection.weight,
            &[hidden, cfg.concat_width()],
        )?;
        expect_shape(PROJECTION_BIAS, &self.projection.bias, &[hidden])?;
        expect_shape(
            CLASSIFIER_WEIGHT,
            &self.classifier.weight,
            &[cfg.class_count, hidden],
        )?;
        expect_shape(CLASSIFIER_BIAS, &self.classifier.bias, &[cfg.class_count])?;

        Ok(())
    }

    /// Deterministic parameters drawn uniformly from `±1/sqrt(fan_in)`.
    ///
    /// Used for the demo model and tests; the same `seed` always yields the same weights.
    pub fn seeded(config: ModelConfig, seed: u64, device: &Device) -> ModelResult<Self> {
        config.validate().map_err(ModelError::configuration)?;

        let mut rng = SeededUniform::new(seed);
        let c = config.channel_count;
        let conv_fan_in = config.embedding_dim * config.filter_width;
        let hidden = config.hidden_width();
        let concat = config.concat_width();

        let conv = |rng: &mut SeededUniform| -> ModelResult<LayerWeights> {
            Ok(LayerWeights {
                weight: rng.tensor(
                    (c, config.embedding_dim, config.filter_width),
                    conv_fan_in,
                    device,
                )?,
                bias: rng.tensor(c, conv_fan_in, device)?,
            })
        };
        let question_conv = conv(&mut rng)?;
        let answer_conv = conv(&mut rng)?;

        let projection = LayerWeights {
            weight: rng.tensor((hidden, concat), concat, device)?,
            bias: rng.tensor(hidden, concat, device)?,
        };
        let classifier = LayerWeights {
            weight: rng.tensor((config.class_count, hidden), hidden, device)?,
            bias: rng.tensor(config.class_count, hidden, device)?,
        };

        Ok(Self {
            config,
            question_conv,
            answer_conv,
            projection,
            classifier,
        })
    }

    /// Named tensors in the persisted layout.
    pub fn to_tensors(&self) -> HashMap<String, Tensor> {
        [
            (QUESTION_CONV_WEIGHT, &self.question_conv.weight),
            (QUESTION_CONV_BIAS, &self.question_conv.bias),
            (ANSWER_CONV_WEIGHT, &self.answer_conv.weight),
            (ANSWER_CONV_BIAS, &self.answer_conv.bias),
            (PROJECTION_WEIGHT, &self.projection.weight),
            (PROJECTION_BIAS, &self.projection.bias),
            (CLASSIFIER_WEIGHT, &self.classifier.weight),
            (CLASSIFIER_BIAS, &self.classifier.bias),
        ]
        .into_iter()
        .map(|(name, tensor)| (name.to_string(), tensor.clone()))
        .collect()
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn question_conv(&self) -> &LayerWeights {
        &self.question_conv
    }

    pub fn answer_conv(&self) -> &LayerWeights {
        &self.answer_conv
    }

    pub fn projection(&self) -> &LayerWeights {
        &self.projection
    }

    pub fn classifier(&self) -> &LayerWeights {
        &self.classifier
    }

    pub fn device(&self) -> &Device {
        self.question_conv.weight.device()
    }
}

fn conv_channels(name: &str, weight: &Tensor) -> ModelResult<usize> {
    match weight.dims() {
        [channels, _, _] => Ok(*channels),
        other => Err(ModelError::corrupt(format!(
            "'{name}' must have 3 axes (channels, embedding_dim, filter_width), got {other:?}"
        ))),
    }
}

fn expect_shape(name: &str, tensor: &Tensor, expected: &[usize]) -> ModelResult<()> {
    if tensor.dims() != expected {
        return Err(ModelError::corrupt(format!(
            "'{name}' has shape {:?}, hyperparameters imply {:?}",
            tensor.dims(),
            expected
        )));
    }
    Ok(())
}

struct SeededUniform {
    state: u64,
}

impl SeededUniform {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next_unit(&mut self) -> f32 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.state >> 40) as f32 / (1u64 << 24) as f32
    }

    fn tensor<S: Into<candle_core::Shape>>(
        &mut self,
        shape: S,
        fan_in: usize,
        device: &Device,
    ) -> ModelResult<Tensor> {
        let shape = shape.into();
        let bound = 1.0 / (fan_in.max(1) as f32).sqrt();
        let data: Vec<f32> = (0..shape.elem_count())
            .map(|_| (self.next_unit() * 2.0 - 1.0) * bound)
            .collect();
        Ok(Tensor::from_vec(data, shape, device)?)
    }
}
