//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `SMCNN_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::path::PathBuf;

use crate::constants::DEFAULT_MAX_SEQ_LEN;
use crate::embedding::{DevicePreference, EncoderConfig};

/// Runtime configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `SMCNN_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Model directory (`config.json` + `model.safetensors`). Unset: seeded demo parameters.
    pub model_path: Option<PathBuf>,

    /// Word-vector text file. Unset: every token gets its hashed unknown-word vector.
    pub word_vectors_path: Option<PathBuf>,

    /// Lowercase tokens before lookup. Default: `false`.
    pub lowercase: bool,

    /// Sentences are truncated to this many tokens. Default: `60`.
    pub max_seq_len: usize,

    /// Seed for demo parameters. Default: `1234`.
    pub demo_seed: u64,

    /// Compute device. Default: `auto`.
    pub device: DevicePreference,
}

/// Seed used for demo parameters when `SMCNN_DEMO_SEED` is not set.
pub const DEFAULT_DEMO_SEED: u64 = 1234;

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: None,
            word_vectors_path: None,
            lowercase: false,
            max_seq_len: DEFAULT_MAX_SEQ_LEN,
            demo_seed: DEFAULT_DEMO_SEED,
            device: DevicePreference::Auto,
        }
    }
}

impl Config {
    const ENV_MODEL_PATH: &'static str = "SMCNN_MODEL_PATH";
    const ENV_WORD_VECTORS_PATH: &'static str = "SMCNN_WORD_VECTORS_PATH";
    const ENV_LOWERCASE: &'static str = "SMCNN_LOWERCASE";
    const ENV_MAX_SEQ_LEN: &'static str = "SMCNN_MAX_SEQ_LEN";
    const ENV_DEMO_SEED: &'static str = "SMCNN_DEMO_SEED";
    const ENV_DEVICE: &'static str = "SMCNN_DEVICE";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let model_path = Self::parse_optional_path_from_env(Self::ENV_MODEL_PATH);
        let word_vectors_path = Self::parse_optional_path_from_env(Self::ENV_WORD_VECTORS_PATH);
        let lowercase = Self::parse_bool_from_env(Self::ENV_LOWERCASE, defaults.lowercase)?;
        let max_seq_len = Self::parse_max_seq_len_from_env(defaults.max_seq_len)?;
        let demo_seed = Self::parse_u64_from_env(Self::ENV_DEMO_SEED, defaults.demo_seed)?;
        let device = Self::parse_device_from_env(defaults.device)?;

        Ok(Self {
            model_path,
            word_vectors_path,
            lowercase,
            max_seq_len,
            demo_seed,
            device,
        })
    }

    /// Validates paths (does not create anything).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref path) = self.model_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_dir() {
                return Err(ConfigError::NotADirectory { path: path.clone() });
            }
        }

        if let Some(ref path) = self.word_vectors_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_file() {
                return Err(ConfigError::NotAFile { path: path.clone() });
            }
        }

        Ok(())
    }

    /// Sentence encoder settings derived from this config.
    pub fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig::default()
            .with_lowercase(self.lowercase)
            .with_max_seq_len(self.max_seq_len)
    }

    fn parse_max_seq_len_from_env(default: usize) -> Result<usize, ConfigError> {
        match env::var(Self::ENV_MAX_SEQ_LEN) {
            Ok(value) => {
                let len: usize = value.trim().parse().map_err(|e| ConfigError::IntParseError {
                    name: Self::ENV_MAX_SEQ_LEN,
                    value: value.clone(),
                    source: e,
                })?;

                if len == 0 {
                    return Err(ConfigError::InvalidMaxSeqLen { value });
                }

                Ok(len)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_device_from_env(default: DevicePreference) -> Result<DevicePreference, ConfigError> {
        match env::var(Self::ENV_DEVICE) {
            Ok(value) => {
                DevicePreference::parse(&value).ok_or(ConfigError::InvalidDevice { value })
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    fn parse_bool_from_env(var_name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match env::var(var_name) {
            Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidBool {
                    name: var_name,
                    value,
                }),
            },
            Err(_) => Ok(default),
        }
    }

    fn parse_u64_from_env(var_name: &'static str, default: u64) -> Result<u64, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e| ConfigError::IntParseError {
                    name: var_name,
                    value,
                    source: e,
                }),
            Err(_) => Ok(default),
        }
    }
}
