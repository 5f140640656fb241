//! Word-vector table loaded from a text vector file.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info};

use crate::constants::UNKNOWN_WORD_RANGE;

use super::error::EmbeddingError;

/// In-memory map from token to a fixed-length vector.
///
/// Tokens missing from the table get a deterministic pseudo-random vector, so the same unknown
/// word always maps to the same input.
#[derive(Clone)]
pub struct WordVectors {
    dim: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl std::fmt::Debug for WordVectors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordVectors")
            .field("dim", &self.dim)
            .field("vocab_size", &self.vectors.len())
            .finish()
    }
}

impl WordVectors {
    /// Creates an empty table: every lookup produces an unknown-word vector.
    pub fn empty(dim: usize) -> Self {
        Self {
            dim,
            vectors: HashMap::new(),
        }
    }

    /// Builds a table from in-memory entries. Every vector must have length `dim`.
    pub fn from_entries<I>(dim: usize, entries: I) -> Result<Self, EmbeddingError>
    where
        I: IntoIterator<Item = (String, Vec<f32>)>,
    {
        let mut vectors = HashMap::new();
        for (idx, (word, vector)) in entries.into_iter().enumerate() {
            if vector.len() != dim {
                return Err(EmbeddingError::InvalidVectors {
                    line: idx + 1,
                    reason: format!(
                        "vector for '{}' has {} values, expected {}",
                        word,
                        vector.len(),
                        dim
                    ),
                });
            }
            vectors.insert(word, vector);
        }
        Ok(Self { dim, vectors })
    }

    /// Reads a `word v1 ... vD` text file. A leading word2vec header (`count dim`) is skipped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EmbeddingError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EmbeddingError::VectorsNotFound {
                path: path.to_path_buf(),
            });
        }

        let reader = BufReader::new(std::fs::File::open(path)?);
        let table = Self::from_reader(reader)?;

        info!(
            path = %path.display(),
            dim = table.dim,
            vocab_size = table.len(),
            "Word vectors loaded"
        );

        Ok(table)
    }

    /// Parses the text format from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, EmbeddingError> {
        let mut dim: Option<usize> = None;
        let mut vectors = HashMap::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };
            let rest: Vec<&str> = parts.collect();

            if line_no == 1 && is_word2vec_header(word, &rest) {
                debug!(header = %line, "Skipping word2vec header");
                continue;
            }

            let vector = rest
                .iter()
                .map(|v| v.parse::<f32>())
                .collect::<Result<Vec<f32>, _>>()
                .map_err(|e| EmbeddingError::InvalidVectors {
                    line: line_no,
                    reason: format!("bad value for '{}': {}", word, e),
                })?;

            if vector.is_empty() {
                return Err(EmbeddingError::InvalidVectors {
                    line: line_no,
                    reason: format!("no values for '{}'", word),
                });
            }

            match dim {
                None => dim = Some(vector.len()),
                Some(expected) if expected != vector.len() => {
                    return Err(EmbeddingError::InvalidVectors {
                        line: line_no,
                        reason: format!(
                            "'{}' has {} values, expected {}",
                            word,
                            vector.len(),
                            expected
                        ),
                    });
                }
                Some(_) => {}
            }

            vectors.insert(word.to_string(), vector);
        }

        let dim = dim.ok_or_else(|| EmbeddingError::InvalidVectors {
            line: 0,
            reason: "file contains no vectors".to_string(),
        })?;

        Ok(Self { dim, vectors })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.vectors.contains_key(token)
    }

    /// Returns the stored vector, or the deterministic unknown-word vector for `token`.
    pub fn lookup(&self, token: &str) -> Cow<'_, [f32]> {
        match self.vectors.get(token) {
            Some(v) => Cow::Borrowed(v.as_slice()),
            None => Cow::Owned(unknown_word_vector(token, self.dim)),
        }
    }
}

fn is_word2vec_header(first: &str, rest: &[&str]) -> bool {
    rest.len() == 1 && first.parse::<usize>().is_ok() && rest[0].parse::<usize>().is_ok()
}

/// Uniform values in `[-UNKNOWN_WORD_RANGE, UNKNOWN_WORD_RANGE]` seeded from the token's hash.
pub fn unknown_word_vector(token: &str, dim: usize) -> Vec<f32> {
    let mut state = unknown_word_seed(token);

    (0..dim)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let unit = (state >> 32) as f32 / u32::MAX as f32;
            (unit * 2.0 - 1.0) * UNKNOWN_WORD_RANGE
        })
        .collect()
}

/// First 8 bytes (little-endian) of the token's BLAKE3 hash.
pub fn unknown_word_seed(token: &str) -> u64 {
    let hash = blake3::hash(token.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}
