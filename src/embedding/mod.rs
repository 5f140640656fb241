//! Sentence embedding: word vectors, tokenization and device selection.
//!
//! - [`vectors`] holds the word-vector table and the unknown-word fallback.
//! - [`encoder`] turns sentences into the `(batch, dim, seq_len)` matrices the model consumes.

/// Device selection (CPU / Metal / CUDA).
pub mod device;
/// Tokenization and sentence encoding.
pub mod encoder;
mod error;
/// Word-vector table.
pub mod vectors;


pub use device::{DevicePreference, select_device};
pub use encoder::{EncoderConfig, SentenceEncoder, tokenize};
pub use error::EmbeddingError;
pub use vectors::{WordVectors, unknown_word_seed, unknown_word_vector};
