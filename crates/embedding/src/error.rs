use thiserror::Error;

/// Errors surfaced by an [`EmbeddingProvider`](crate::EmbeddingProvider).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EmbeddingError {
    /// The provider answered with a vector of the wrong length.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Every attempt failed at the network level (refused, reset, timed out).
    #[error("embedding provider unavailable after {attempts} attempts: {message}")]
    ProviderUnavailable { attempts: u32, message: String },
    /// The provider answered with a non-success status.
    #[error("embedding provider rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    /// The response body did not match `{"embedding": [...]}`.
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
    /// A component was NaN or infinite.
    #[error("embedding contains a non-finite value at index {index}")]
    NonFinite { index: usize },
    #[error("invalid embedding config: {0}")]
    InvalidConfig(String),
}
