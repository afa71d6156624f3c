//! # plagscan index
//!
//! Client side of the vector index: bootstrap a collection, upsert document
//! embeddings, and search for near neighbors with payload filters.
//!
//! [`VectorIndex`] is the contract the detector depends on. Any engine that
//! offers collection bootstrap, point upsert and filtered search fits
//! behind it:
//!
//! * [`QdrantIndex`] speaks the Qdrant REST API. It polls the service for
//!   readiness at startup, tolerates concurrent collection creation and
//!   retries upserts on transport failures. Searches are never retried.
//! * [`InMemoryIndex`] keeps everything in process for tests and
//!   single-node use.
//!
//! Points are addressed by a [`PointId`] derived from the
//! `(sender, work_id, file_name)` triple, so re-submitting the same file
//! overwrites the earlier point instead of adding a duplicate.
//!
//! ```
//! use embedding::EmbeddingVector;
//! use index::{CollectionSpec, DocumentPoint, InMemoryIndex, SearchQuery, VectorIndex};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let index = InMemoryIndex::new();
//! index.ensure_collection(&CollectionSpec::cosine("documents", 2)).await.unwrap();
//!
//! let v = EmbeddingVector::new(vec![0.6, 0.8], 2).unwrap();
//! index
//!     .upsert("documents", &DocumentPoint::new(v.clone(), "A", "W1", "a.txt"))
//!     .await
//!     .unwrap();
//!
//! // A searching for its own work never sees its own point.
//! let own = SearchQuery::neighbors(v.clone(), "W1", "A", 5, 0.7);
//! assert!(index.search("documents", &own).await.unwrap().is_empty());
//!
//! let other = SearchQuery::neighbors(v, "W1", "B", 5, 0.7);
//! assert_eq!(index.search("documents", &other).await.unwrap()[0].sender, "A");
//! # }
//! ```

use async_trait::async_trait;
use std::sync::Arc;

mod config;
mod error;
mod filter;
mod memory;
mod qdrant;
mod types;

pub use crate::config::{IndexBackendKind, IndexConfig};
pub use crate::error::IndexError;
pub use crate::filter::{Condition, Filter, MatchValue, PayloadField};
pub use crate::memory::InMemoryIndex;
pub use crate::qdrant::{QdrantIndex, QdrantTimeouts};
pub use crate::types::{
    compare_matches, rank_matches, CollectionSpec, Distance, DocumentPoint, Match, PointId,
    SearchQuery,
};

/// Vector index operations required by the detection pipeline.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Creates the collection if absent; a compatible existing collection
    /// is a no-op and a concurrent "already exists" counts as success.
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), IndexError>;

    /// Inserts or overwrites `point`, returning its id.
    async fn upsert(&self, collection: &str, point: &DocumentPoint) -> Result<PointId, IndexError>;

    /// Up to `query.limit` matches scoring at least `query.score_threshold`,
    /// highest score first, earliest insertion first on ties.
    async fn search(&self, collection: &str, query: &SearchQuery) -> Result<Vec<Match>, IndexError>;

    fn name(&self) -> &'static str;
}

/// Builds the index selected by `cfg.backend`.
pub fn build_index(cfg: &IndexConfig) -> Result<Arc<dyn VectorIndex>, IndexError> {
    cfg.validate()?;
    let index: Arc<dyn VectorIndex> = match cfg.backend {
        IndexBackendKind::Qdrant => Arc::new(QdrantIndex::from_config(cfg)?),
        IndexBackendKind::InMemory => Arc::new(InMemoryIndex::new()),
    };
    Ok(index)
}
