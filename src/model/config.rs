use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DROPOUT, MODEL_FORMAT_VERSION, REFERENCE_AUX_FEATURE_COUNT, REFERENCE_CHANNEL_COUNT,
    REFERENCE_CLASS_COUNT, REFERENCE_EMBEDDING_DIM, REFERENCE_FILTER_WIDTH,
};

use super::activation::{Activation, Softsign, Tanh};

/// Bounded nonlinearity stored in the model config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationKind {
    #[default]
    Tanh,
    Softsign,
}

impl ActivationKind {
    pub fn build(self) -> Arc<dyn Activation> {
        match self {
            ActivationKind::Tanh => Arc::new(Tanh),
            ActivationKind::Softsign => Arc::new(Softsign),
        }
    }
}

fn default_dropout() -> f32 {
    DEFAULT_DROPOUT
}

/// Structural hyperparameters of a trained model (`config.json` in a model directory).
///
/// The structural fields have no serde defaults: a blob missing any of them is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub format_version: u32,
    /// Word-vector length (`D`).
    pub embedding_dim: usize,
    /// Positions spanned by each filter (`W`).
    pub filter_width: usize,
    /// Filters per branch (`C`).
    pub channel_count: usize,
    /// Width of the auxiliary feature vector (`F`).
    pub aux_feature_count: usize,
    /// Output classes (`K`).
    pub class_count: usize,
    /// When false, auxiliary features are not part of the concatenated vector.
    pub use_aux_features: bool,
    /// Drop probability used in training mode.
    #[serde(default = "default_dropout")]
    pub dropout: f32,
    #[serde(default)]
    pub activation: ActivationKind,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::reference()
    }
}

impl ModelConfig {
    /// The reference TrecQA configuration: D=50, W=5, C=100, F=4, K=2, auxiliary features on.
    pub fn reference() -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            embedding_dim: REFERENCE_EMBEDDING_DIM,
            filter_width: REFERENCE_FILTER_WIDTH,
            channel_count: REFERENCE_CHANNEL_COUNT,
            aux_feature_count: REFERENCE_AUX_FEATURE_COUNT,
            class_count: REFERENCE_CLASS_COUNT,
            use_aux_features: true,
            dropout: DEFAULT_DROPOUT,
            activation: ActivationKind::Tanh,
        }
    }

    pub fn with_embedding_dim(mut self, embedding_dim: usize) -> Self {
        self.embedding_dim = embedding_dim;
        self
    }

    pub fn with_filter_width(mut self, filter_width: usize) -> Self {
        self.filter_width = filter_width;
        self
    }

    pub fn with_channel_count(mut self, channel_count: usize) -> Self {
        self.channel_count = channel_count;
        self
    }

    pub fn with_aux_features(mut self, aux_feature_count: usize) -> Self {
        self.aux_feature_count = aux_feature_count;
        self.use_aux_features = true;
        self
    }

    pub fn without_aux_features(mut self) -> Self {
        self.use_aux_features = false;
        self
    }

    pub fn with_class_count(mut self, class_count: usize) -> Self {
        self.class_count = class_count;
        self
    }

    pub fn with_dropout(mut self, dropout: f32) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_activation(mut self, activation: ActivationKind) -> Self {
        self.activation = activation;
        self
    }

    /// Auxiliary features that actually reach the concatenated vector.
    pub fn effective_aux_feature_count(&self) -> usize {
        if self.use_aux_features {
            self.aux_feature_count
        } else {
            0
        }
    }

    /// Width of `[q_vec, a_vec(, aux)]`, the projection layer's input.
    pub fn concat_width(&self) -> usize {
        2 * self.channel_count + self.effective_aux_feature_count()
    }

    /// Projection layer output width.
    ///
    /// Equal to [`concat_width`](Self::concat_width): `2 * channel_count +
    /// effective_aux_feature_count()`, so disabling aux features shrinks it too. Stored projection
    /// and classifier weights must match it.
    pub fn hidden_width(&self) -> usize {
        self.concat_width()
    }

    /// Length of the convolution output for an input of `seq_len` positions.
    pub fn conv_output_len(&self, seq_len: usize) -> usize {
        seq_len + self.filter_width - 1
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(format!(
                "unsupported format_version {} (expected {})",
                self.format_version, MODEL_FORMAT_VERSION
            ));
        }

        let positive = [
            ("embedding_dim", self.embedding_dim),
            ("filter_width", self.filter_width),
            ("channel_count", self.channel_count),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(format!("{name} must be at least 1"));
            }
        }

        if self.class_count < 2 {
            return Err(format!(
                "class_count must be at least 2, got {}",
                self.class_count
            ));
        }

        if self.use_aux_features && self.aux_feature_count == 0 {
            return Err("use_aux_features is set but aux_feature_count is 0".to_string());
        }

        if !(0.0..1.0).contains(&self.dropout) {
            return Err(format!(
                "dropout must be in [0.0, 1.0), got {}",
                self.dropout
            ));
        }

        Ok(())
    }
}
