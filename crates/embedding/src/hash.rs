use async_trait::async_trait;
use fxhash::hash64;

use crate::normalize::l2_normalize_in_place;
use crate::{EmbeddingError, EmbeddingProvider, EmbeddingVector};

/// Deterministic provider used when no embedding service is available.
///
/// Seeds a hash of the text, expands it per component into `[-1, 1]` and
/// L2-normalizes the result. Identical text always maps to the identical
/// vector; the empty string is a valid input.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbeddingProvider {
    dimension: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Synchronous form of [`EmbeddingProvider::embed`]; never fails for a
    /// nonzero dimension.
    pub fn embed_text(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let seed = hash64(text);
        let mut values: Vec<f32> = (0..self.dimension as u64)
            .map(|idx| {
                let h = hash64(&(seed, idx));
                ((h as f64 / u64::MAX as f64) * 2.0 - 1.0) as f32
            })
            .collect();
        l2_normalize_in_place(&mut values);
        EmbeddingVector::new(values, self.dimension)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        self.embed_text(text)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &'static str {
        "hash"
    }
}
