use embedding::EmbeddingError;
use index::IndexError;
use std::fmt;
use thiserror::Error;

/// Errors from the report store and its backends.
#[derive(Debug, Error)]
pub enum ReportStoreError {
    /// The storage backend failed (database or lock error).
    #[error("report backend error: {0}")]
    Backend(String),
    #[error("report storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ReportStoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        ReportStoreError::Backend(msg.into())
    }
}

/// Pipeline step at which an analysis failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Embedding,
    IndexWrite,
    IndexSearch,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Embedding => "embedding",
            Stage::IndexWrite => "index-write",
            Stage::IndexSearch => "index-search",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Underlying error of a failed stage.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FailureCause {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// A submission that could not be analyzed.
///
/// Distinct from a completed analysis with `plagiarized == false`: no
/// verdict exists for this submission.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("analysis failed at {stage}: {cause}")]
pub struct AnalysisFailed {
    pub stage: Stage,
    #[source]
    pub cause: FailureCause,
    /// Whether an error-tagged report was recorded for the attempt.
    pub recorded: bool,
}

impl AnalysisFailed {
    /// `"embedding"`, `"index-write"` or `"index-search"`.
    pub fn reason(&self) -> &'static str {
        self.stage.as_str()
    }
}

/// Errors raised while wiring a detector.
#[derive(Debug, Error, PartialEq)]
pub enum DetectorError {
    #[error("invalid detector config: {0}")]
    InvalidConfig(String),
    /// The embedding provider and the collection disagree on dimension.
    #[error("provider `{provider}` yields {provider_dimension}-dimensional vectors but the collection expects {collection_dimension}")]
    DimensionMismatch {
        provider: &'static str,
        provider_dimension: usize,
        collection_dimension: usize,
    },
}
