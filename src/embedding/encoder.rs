//! Sentence → [`TokenMatrix`] encoding.

use candle_core::{Device, Tensor};
use tokenizers::pre_tokenizers::whitespace::Whitespace;
use tokenizers::{OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer};
use tracing::debug;

use crate::constants::DEFAULT_MAX_SEQ_LEN;
use crate::model::TokenMatrix;

use super::error::EmbeddingError;
use super::vectors::WordVectors;

/// Splits `text` into word and punctuation tokens.
pub fn tokenize(text: &str, lowercase: bool) -> Result<Vec<String>, EmbeddingError> {
    let mut pretokenized = PreTokenizedString::from(text);
    Whitespace::default()
        .pre_tokenize(&mut pretokenized)
        .map_err(|e| EmbeddingError::TokenizationFailed {
            reason: e.to_string(),
        })?;

    Ok(pretokenized
        .get_splits(OffsetReferential::Original, OffsetType::Byte)
        .into_iter()
        .map(|(token, _, _)| {
            if lowercase {
                token.to_lowercase()
            } else {
                token.to_string()
            }
        })
        .collect())
}

#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Lowercase tokens before lookup.
    pub lowercase: bool,
    /// Sentences longer than this are truncated.
    pub max_seq_len: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            lowercase: false,
            max_seq_len: DEFAULT_MAX_SEQ_LEN,
        }
    }
}

impl EncoderConfig {
    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    pub fn with_max_seq_len(mut self, max_seq_len: usize) -> Self {
        self.max_seq_len = max_seq_len;
        self
    }

    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.max_seq_len == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "max_seq_len must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Turns sentences into `(batch, embedding_dim, seq_len)` matrices of word vectors.
#[derive(Debug, Clone)]
pub struct SentenceEncoder {
    vectors: WordVectors,
    config: EncoderConfig,
    device: Device,
}

impl SentenceEncoder {
    pub fn new(
        vectors: WordVectors,
        config: EncoderConfig,
        device: Device,
    ) -> Result<Self, EmbeddingError> {
        config.validate()?;
        Ok(Self {
            vectors,
            config,
            device,
        })
    }

    pub fn embedding_dim(&self) -> usize {
        self.vectors.dim()
    }

    pub fn vectors(&self) -> &WordVectors {
        &self.vectors
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Tokenizes and truncates `text` according to the encoder config.
    pub fn tokens(&self, text: &str) -> Result<Vec<String>, EmbeddingError> {
        let mut tokens = tokenize(text, self.config.lowercase)?;
        tokens.truncate(self.config.max_seq_len);
        Ok(tokens)
    }

    /// Encodes one sentence as a `(1, D, L)` matrix.
    pub fn encode(&self, text: &str) -> Result<TokenMatrix, EmbeddingError> {
        let tokens = self.tokens(text)?;
        self.encode_tokens(&tokens)
    }

    /// Encodes pre-tokenized input as a `(1, D, L)` matrix.
    pub fn encode_tokens(&self, tokens: &[String]) -> Result<TokenMatrix, EmbeddingError> {
        if tokens.is_empty() {
            return Err(EmbeddingError::EmptySentence);
        }
        let tokens = &tokens[..tokens.len().min(self.config.max_seq_len)];

        let unknown = tokens.iter().filter(|t| !self.vectors.contains(t)).count();
        debug!(
            token_count = tokens.len(),
            unknown_tokens = unknown,
            "Encoding sentence"
        );

        let data = self.column_major(&[tokens.to_vec()], tokens.len());
        let tensor = Tensor::from_vec(data, (1, self.embedding_dim(), tokens.len()), &self.device)?;
        Ok(TokenMatrix::new(tensor)?)
    }

    /// Encodes several sentences into one `(B, D, L_max)` matrix, zero-padding shorter ones.
    pub fn encode_batch(&self, texts: &[&str]) -> Result<TokenMatrix, EmbeddingError> {
        if texts.is_empty() {
            return Err(EmbeddingError::EmptySentence);
        }

        let sentences = texts
            .iter()
            .map(|text| {
                let tokens = self.tokens(text)?;
                if tokens.is_empty() {
                    return Err(EmbeddingError::EmptySentence);
                }
                Ok(tokens)
            })
            .collect::<Result<Vec<_>, EmbeddingError>>()?;

        let max_len = sentences.iter().map(Vec::len).max().unwrap_or(0);
        let data = self.column_major(&sentences, max_len);
        let tensor = Tensor::from_vec(
            data,
            (sentences.len(), self.embedding_dim(), max_len),
            &self.device,
        )?;
        Ok(TokenMatrix::new(tensor)?)
    }

    /// Lays out word vectors as `[batch][dim][position]`, zero past each sentence's end.
    fn column_major(&self, sentences: &[Vec<String>], seq_len: usize) -> Vec<f32> {
        let dim = self.embedding_dim();
        let mut data = vec![0.0f32; sentences.len() * dim * seq_len];

        for (b, tokens) in sentences.iter().enumerate() {
            for (pos, token) in tokens.iter().enumerate() {
                let vector = self.vectors.lookup(token);
                for (d, value) in vector.iter().enumerate() {
                    data[b * dim * seq_len + d * seq_len + pos] = *value;
                }
            }
        }

        data
    }
}
