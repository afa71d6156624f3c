//! # plagscan embedding
//!
//! Turns document text into a fixed-length vector for similarity search.
//!
//! The pipeline only ever talks to the [`EmbeddingProvider`] trait. Two
//! implementations ship with the crate:
//!
//! * [`HttpEmbeddingProvider`] calls an external embedding service and
//!   retries connection failures with linear backoff.
//! * [`HashEmbeddingProvider`] derives a deterministic unit vector from a
//!   hash of the text. It needs no network, which keeps every other part of
//!   the pipeline testable offline.
//!
//! Whichever provider is active, the returned [`EmbeddingVector`] has exactly
//! the configured dimension and only finite components; a provider answer of
//! any other length is an [`EmbeddingError::DimensionMismatch`].
//!
//! ```
//! use embedding::{EmbeddingProvider, HashEmbeddingProvider, EMBEDDING_DIM};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let provider = HashEmbeddingProvider::new(EMBEDDING_DIM);
//! let v = provider.embed("alpha").await.unwrap();
//! assert_eq!(v.len(), EMBEDDING_DIM);
//! assert!((v.norm() - 1.0).abs() < 1e-4);
//! # }
//! ```

use async_trait::async_trait;
use std::sync::Arc;

mod config;
mod error;
mod hash;
mod http;
mod normalize;
mod types;

pub use crate::config::{EmbeddingConfig, EmbeddingMode};
pub use crate::error::EmbeddingError;
pub use crate::hash::HashEmbeddingProvider;
pub use crate::http::HttpEmbeddingProvider;
pub use crate::normalize::{cosine_similarity, l2_norm};
pub use crate::types::EmbeddingVector;

/// Dimension agreed with the embedding service.
pub const EMBEDDING_DIM: usize = 384;

/// Capability that turns raw document text into an [`EmbeddingVector`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed `text`. Empty text is valid input.
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError>;

    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;

    /// Short label for logs and metrics.
    fn name(&self) -> &'static str;
}

/// Builds the provider selected by `cfg.mode`.
pub fn build_provider(cfg: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    cfg.validate()?;
    let provider: Arc<dyn EmbeddingProvider> = match cfg.mode {
        EmbeddingMode::Http => Arc::new(HttpEmbeddingProvider::from_config(cfg)?),
        EmbeddingMode::Hash => Arc::new(HashEmbeddingProvider::new(cfg.dimension)),
    };
    Ok(provider)
}
