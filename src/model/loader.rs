//! Model directory reader/writer: `config.json` + `model.safetensors`.

use std::path::{Path, PathBuf};

use candle_core::Device;
use tracing::{debug, info};

use crate::constants::{MODEL_CONFIG_FILENAME, MODEL_WEIGHTS_FILENAME};

use super::config::ModelConfig;
use super::error::{ModelError, ModelResult};
use super::params::ModelParameters;

/// Reads and writes persisted [`ModelParameters`].
///
/// The directory layout is the schema boundary: the config must carry every structural field and
/// a known `format_version`, and each stored tensor must have exactly the shape the config
/// implies.
#[derive(Debug, Clone)]
pub struct ModelLoader {
    model_dir: PathBuf,
}

impl ModelLoader {
    pub fn new<P: Into<PathBuf>>(model_dir: P) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.model_dir.join(MODEL_CONFIG_FILENAME)
    }

    pub fn weights_path(&self) -> PathBuf {
        self.model_dir.join(MODEL_WEIGHTS_FILENAME)
    }

    /// Reads only the hyperparameters.
    pub fn load_config(&self) -> ModelResult<ModelConfig> {
        let config_path = self.config_path();
        if !config_path.exists() {
            return Err(ModelError::ModelNotFound { path: config_path });
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: ModelConfig = serde_json::from_str(&content).map_err(|e| {
            ModelError::corrupt(format!(
                "failed to parse {}: {}",
                config_path.display(),
                e
            ))
        })?;
        config.validate().map_err(ModelError::corrupt)?;

        debug!(?config, "Model config parsed");
        Ok(config)
    }

    pub fn load(&self, device: &Device) -> ModelResult<ModelParameters> {
        if !self.model_dir.is_dir() {
            return Err(ModelError::ModelNotFound {
                path: self.model_dir.clone(),
            });
        }

        let config = self.load_config()?;

        let weights_path = self.weights_path();
        if !weights_path.exists() {
            return Err(ModelError::ModelNotFound { path: weights_path });
        }

        let tensors = candle_core::safetensors::load(&weights_path, device).map_err(|e| {
            ModelError::corrupt(format!(
                "failed to read {}: {}",
                weights_path.display(),
                e
            ))
        })?;

        let params = ModelParameters::from_tensors(config, tensors)?;

        info!(
            model_dir = %self.model_dir.display(),
            embedding_dim = params.config().embedding_dim,
            filter_width = params.config().filter_width,
            channel_count = params.config().channel_count,
            aux_features = params.config().effective_aux_feature_count(),
            class_count = params.config().class_count,
            "Model parameters loaded"
        );

        Ok(params)
    }

    /// Writes `params` in the layout [`ModelLoader::load`] reads, creating the directory.
    pub fn save(&self, params: &ModelParameters) -> ModelResult<()> {
        std::fs::create_dir_all(&self.model_dir)?;

        let config_json = serde_json::to_string_pretty(params.config()).map_err(|e| {
            ModelError::Io(std::io::Error::other(format!(
                "failed to serialize model config: {e}"
            )))
        })?;
        std::fs::write(self.config_path(), config_json)?;

        candle_core::safetensors::save(&params.to_tensors(), self.weights_path())?;

        info!(model_dir = %self.model_dir.display(), "Model parameters saved");
        Ok(())
    }
}
