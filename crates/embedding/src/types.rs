use serde::Serialize;

use crate::normalize::l2_norm;
use crate::EmbeddingError;

/// Fixed-length embedding with finite components.
///
/// Construction checks the length against the agreed dimension, so holding
/// an `EmbeddingVector` means the contract has already been validated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    /// Validates `values` against `dimension` and rejects NaN/Inf.
    pub fn new(values: Vec<f32>, dimension: usize) -> Result<Self, EmbeddingError> {
        if values.len() != dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                actual: values.len(),
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(EmbeddingError::NonFinite { index });
        }
        Ok(Self(values))
    }

    /// Narrows provider output (JSON numbers are f64) before validating.
    pub fn from_f64(values: &[f64], dimension: usize) -> Result<Self, EmbeddingError> {
        Self::new(values.iter().map(|&v| v as f32).collect(), dimension)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn norm(&self) -> f32 {
        l2_norm(&self.0)
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl AsRef<[f32]> for EmbeddingVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}
