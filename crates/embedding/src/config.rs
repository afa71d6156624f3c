use resilience::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{EmbeddingError, EMBEDDING_DIM};

/// Which provider backs the pipeline.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingMode {
    /// Remote embedding service speaking `{"text"}` -> `{"embedding"}`.
    #[default]
    Http,
    /// Deterministic content-hash vectors, no network.
    Hash,
}

/// Embedding provider configuration.
///
/// # Example
/// ```
/// use embedding::{EmbeddingConfig, EmbeddingMode};
///
/// let cfg = EmbeddingConfig {
///     mode: EmbeddingMode::Hash,
///     ..Default::default()
/// };
/// assert!(cfg.validate().is_ok());
/// assert_eq!(cfg.dimension, 384);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub mode: EmbeddingMode,
    /// Endpoint used in `http` mode.
    #[serde(default = "default_api_url")]
    pub api_url: Option<String>,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    /// Per-request timeout. Embedding is the heaviest outbound call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_api_url() -> Option<String> {
    Some("http://embeddings:8003/embed".to_string())
}

fn default_dimension() -> usize {
    EMBEDDING_DIM
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::default(),
            api_url: default_api_url(),
            dimension: default_dimension(),
            timeout_secs: default_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.dimension == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "dimension must be greater than 0".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.mode == EmbeddingMode::Http {
            match self.api_url.as_deref() {
                Some(url) if !url.trim().is_empty() => {}
                _ => {
                    return Err(EmbeddingError::InvalidConfig(
                        "api_url is required in http mode".into(),
                    ))
                }
            }
            if self.timeout_secs == 0 {
                return Err(EmbeddingError::InvalidConfig(
                    "timeout_secs must be greater than 0".into(),
                ));
            }
        }
        Ok(())
    }
}
