use candle_core::{DType, Device, Tensor};

use super::error::{ModelError, ModelResult};

/// Sentences as word vectors: `(batch, embedding_dim, seq_len)`, f32.
#[derive(Debug, Clone)]
pub struct TokenMatrix(Tensor);

impl TokenMatrix {
    /// Wraps a rank-3 tensor (converted to f32).
    pub fn new(tensor: Tensor) -> ModelResult<Self> {
        if tensor.rank() != 3 {
            return Err(ModelError::invalid_input(format!(
                "token matrix must have 3 axes (batch, embedding_dim, seq_len), got shape {:?}",
                tensor.dims()
            )));
        }
        Ok(Self(tensor.to_dtype(DType::F32)?))
    }

    /// Builds a `(1, D, L)` matrix from the word vectors of one sentence, in token order.
    pub fn from_word_vectors(vectors: &[Vec<f32>], dim: usize, device: &Device) -> ModelResult<Self> {
        if vectors.is_empty() {
            return Err(ModelError::invalid_input("sentence has zero tokens"));
        }
        if let Some((pos, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
            return Err(ModelError::invalid_input(format!(
                "word vector at position {} has {} values, expected {}",
                pos,
                v.len(),
                dim
            )));
        }

        let seq_len = vectors.len();
        let mut data = vec![0.0f32; dim * seq_len];
        for (pos, vector) in vectors.iter().enumerate() {
            for (d, value) in vector.iter().enumerate() {
                data[d * seq_len + pos] = *value;
            }
        }

        Ok(Self(Tensor::from_vec(data, (1, dim, seq_len), device)?))
    }

    pub fn zeros(batch: usize, dim: usize, seq_len: usize, device: &Device) -> ModelResult<Self> {
        Ok(Self(Tensor::zeros((batch, dim, seq_len), DType::F32, device)?))
    }

    pub fn batch_size(&self) -> usize {
        self.0.dims()[0]
    }

    pub fn embedding_dim(&self) -> usize {
        self.0.dims()[1]
    }

    pub fn seq_len(&self) -> usize {
        self.0.dims()[2]
    }

    pub fn tensor(&self) -> &Tensor {
        &self.0
    }

    pub fn into_inner(self) -> Tensor {
        self.0
    }
}

/// Per-pair auxiliary features: `(batch, feature_count)`, f32.
#[derive(Debug, Clone)]
pub struct AuxFeatures(Tensor);

impl AuxFeatures {
    /// Wraps a rank-2 tensor (converted to f32).
    pub fn new(tensor: Tensor) -> ModelResult<Self> {
        if tensor.rank() != 2 {
            return Err(ModelError::invalid_input(format!(
                "aux features must have 2 axes (batch, feature_count), got shape {:?}",
                tensor.dims()
            )));
        }
        Ok(Self(tensor.to_dtype(DType::F32)?))
    }

    /// One row per pair; all rows must have the same width.
    pub fn from_rows(rows: &[Vec<f32>], device: &Device) -> ModelResult<Self> {
        let Some(first) = rows.first() else {
            return Err(ModelError::invalid_input("aux features need at least one row"));
        };
        let width = first.len();
        if rows.iter().any(|r| r.len() != width) {
            return Err(ModelError::invalid_input(
                "aux feature rows have different widths",
            ));
        }

        let data: Vec<f32> = rows.iter().flatten().copied().collect();
        Ok(Self(Tensor::from_vec(data, (rows.len(), width), device)?))
    }

    /// A single row.
    pub fn from_slice(values: &[f32], device: &Device) -> ModelResult<Self> {
        Self::from_rows(&[values.to_vec()], device)
    }

    pub fn zeros(batch: usize, feature_count: usize, device: &Device) -> ModelResult<Self> {
        Ok(Self(Tensor::zeros(
            (batch, feature_count),
            DType::F32,
            device,
        )?))
    }

    pub fn batch_size(&self) -> usize {
        self.0.dims()[0]
    }

    pub fn feature_count(&self) -> usize {
        self.0.dims()[1]
    }

    pub fn tensor(&self) -> &Tensor {
        &self.0
    }
}
