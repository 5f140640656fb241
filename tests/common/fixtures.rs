//! Test fixtures for integration tests.

use std::path::{Path, PathBuf};

use candle_core::Device;
use smcnn::embedding::{EncoderConfig, SentenceEncoder, WordVectors};
use smcnn::model::{ModelConfig, ModelLoader, ModelParameters};

pub const FIXTURE_SEED: u64 = 2015;

pub const FIXTURE_DIM: usize = 8;

pub const QUESTION: &str = "Who wrote Hamlet ?";

pub const ANSWERS: &[&str] = &[
    "Hamlet was written by William Shakespeare .",
    "The play is set in Denmark .",
    "Shakespeare wrote many plays .",
];

/// A small model that keeps the reference structure (four aux features, two classes).
pub fn fixture_config() -> ModelConfig {
    ModelConfig::reference()
        .with_embedding_dim(FIXTURE_DIM)
        .with_filter_width(3)
        .with_channel_count(6)
}

pub fn fixture_params() -> ModelParameters {
    ModelParameters::seeded(fixture_config(), FIXTURE_SEED, &Device::Cpu)
        .expect("seeded parameters")
}

/// Writes a `word v1 ... vD` file with a word2vec header.
pub fn write_word_vectors(dir: &Path) -> PathBuf {
    let words = [
        "who", "wrote", "hamlet", "was", "written", "by", "shakespeare", "the", "play",
    ];
    let mut content = format!("{} {}\n", words.len(), FIXTURE_DIM);
    for (i, word) in words.iter().enumerate() {
        let values: Vec<String> = (0..FIXTURE_DIM)
            .map(|d| format!("{:.3}", ((i * FIXTURE_DIM + d) % 7) as f32 / 7.0 - 0.5))
            .collect();
        content.push_str(&format!("{} {}\n", word, values.join(" ")));
    }

    let path = dir.join("vectors.txt");
    std::fs::write(&path, content).expect("write vectors");
    path
}

pub fn fixture_encoder(dir: &Path) -> SentenceEncoder {
    let vectors = WordVectors::from_file(write_word_vectors(dir)).expect("load vectors");
    SentenceEncoder::new(
        vectors,
        EncoderConfig::default().with_lowercase(true),
        Device::Cpu,
    )
    .expect("encoder")
}

/// Saves [`fixture_params`] into `dir/model` and returns the model directory.
pub fn save_fixture_model(dir: &Path) -> PathBuf {
    let model_dir = dir.join("model");
    ModelLoader::new(model_dir.clone())
        .save(&fixture_params())
        .expect("save model");
    model_dir
}

pub fn assert_close(a: &[Vec<f32>], b: &[Vec<f32>]) {
    assert_eq!(a.len(), b.len());
    for (row_a, row_b) in a.iter().zip(b) {
        assert_eq!(row_a.len(), row_b.len());
        for (x, y) in row_a.iter().zip(row_b) {
            assert!((x - y).abs() < 1e-5, "{x} != {y}");
        }
    }
}
