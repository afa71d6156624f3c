use thiserror::Error;

/// Errors surfaced by a [`VectorIndex`](crate::VectorIndex).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IndexError {
    /// The index could not be reached within the retry budget.
    #[error("vector index unavailable after {attempts} attempts: {message}")]
    Unavailable { attempts: u32, message: String },
    /// The index answered an upsert with a non-success status.
    #[error("upsert rejected with status {status}: {message}")]
    UpsertRejected { status: u16, message: String },
    /// A search failed. `status` is `None` for transport-level failures.
    #[error("search failed{}: {message}", .status.map(|s| format!(" with status {s}")).unwrap_or_default())]
    SearchFailed { status: Option<u16>, message: String },
    /// The collection exists with an incompatible dimension or metric.
    #[error("collection `{name}` is incompatible: {detail}")]
    CollectionMismatch { name: String, detail: String },
    /// Checking or creating the collection returned an unexpected status.
    #[error("collection bootstrap failed with status {status}: {message}")]
    Bootstrap { status: u16, message: String },
    #[error("failed to decode index response: {0}")]
    Decode(String),
    #[error("invalid index config: {0}")]
    InvalidConfig(String),
}
