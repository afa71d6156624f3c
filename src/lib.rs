//! Workspace umbrella crate for plagscan.
//!
//! This crate wires an embedding provider, a vector index and a report store
//! into a [`PlagiarismDetector`] from a single [`PipelineConfig`], and
//! re-exports the types callers need to drive it.
//!
//! ```
//! use plagscan::{Pipeline, PipelineConfig, Submission};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = PipelineConfig::from_yaml(
//!     "embedding: { mode: hash }\nindex: { backend: in_memory }\n",
//! )
//! .unwrap();
//! let pipeline = Pipeline::from_config(&config).unwrap();
//! pipeline.bootstrap().await.unwrap();
//!
//! let analysis = pipeline
//!     .detector()
//!     .analyze(&Submission::new("A", "W1", "a.txt", "alpha"))
//!     .await
//!     .unwrap();
//! assert!(!analysis.verdict.plagiarized);
//! # }
//! ```

pub mod config;

pub use crate::config::{ConfigLoadError, PipelineConfig};
pub use detector::{
    Analysis, AnalysisFailed, DetectionMetrics, DetectorConfig, DetectorError, FailureCause,
    Outcome, PlagiarismDetector, Report, ReportBackendConfig, ReportStore, ReportStoreError,
    Stage, Submission, Verdict,
};
pub use embedding::{
    build_provider, EmbeddingConfig, EmbeddingError, EmbeddingMode, EmbeddingProvider,
    EmbeddingVector,
};
pub use index::{
    build_index, IndexBackendKind, IndexConfig, IndexError, Match, PointId, QdrantIndex,
    VectorIndex,
};
pub use resilience::{Backoff, RetryPolicy};

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors raised while assembling a [`Pipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigLoadError),
    #[error("embedding provider: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("vector index: {0}")]
    Index(#[from] IndexError),
    #[error("report store: {0}")]
    Reports(#[from] ReportStoreError),
    #[error(transparent)]
    Detector(#[from] DetectorError),
}

/// A fully wired detector.
pub struct Pipeline {
    detector: Arc<PlagiarismDetector>,
}

impl Pipeline {
    /// Builds every component described by `config`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        Self::build(config, None)
    }

    /// Like [`from_config`](Self::from_config), reporting analyses to `metrics`.
    pub fn from_config_with_metrics(
        config: &PipelineConfig,
        metrics: Arc<dyn DetectionMetrics>,
    ) -> Result<Self, PipelineError> {
        Self::build(config, Some(metrics))
    }

    fn build(
        config: &PipelineConfig,
        metrics: Option<Arc<dyn DetectionMetrics>>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let embedder = build_provider(&config.embedding)?;
        let index = build_index(&config.index)?;
        let reports = Arc::new(ReportStore::from_config(&config.reports)?);

        info!(
            embedding = embedder.name(),
            index = index.name(),
            reports = reports.backend_name(),
            collection = %config.detector.collection,
            "pipeline assembled"
        );

        let mut detector =
            PlagiarismDetector::new(embedder, index, reports, config.detector.clone())?;
        if let Some(metrics) = metrics {
            detector = detector.with_metrics(metrics);
        }
        Ok(Self {
            detector: Arc::new(detector),
        })
    }

    /// Ensures the collection, first waiting for a remote index to come up.
    ///
    /// Must succeed before the first analysis; an index that never becomes
    /// ready is reported as [`IndexError::Unavailable`].
    pub async fn bootstrap(&self) -> Result<(), IndexError> {
        self.detector.bootstrap().await
    }

    pub fn detector(&self) -> &Arc<PlagiarismDetector> {
        &self.detector
    }
}
