use resilience::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::IndexError;

/// Which vector index implementation to use.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackendKind {
    #[default]
    Qdrant,
    InMemory,
}

/// Vector index client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexConfig {
    #[serde(default)]
    pub backend: IndexBackendKind,
    /// Base URL of the Qdrant REST API.
    #[serde(default = "default_url")]
    pub url: Option<String>,
    /// Timeout for collection checks and searches.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Timeout for collection creation.
    #[serde(default = "default_create_timeout_secs")]
    pub create_timeout_secs: u64,
    /// Timeout for a single upsert attempt; `wait=true` makes upserts slower.
    #[serde(default = "default_upsert_timeout_secs")]
    pub upsert_timeout_secs: u64,
    /// Polling applied before the first collection check at startup.
    #[serde(default = "default_readiness")]
    pub readiness: RetryPolicy,
    #[serde(default = "default_upsert_retry")]
    pub upsert_retry: RetryPolicy,
}

fn default_url() -> Option<String> {
    Some("http://qdrant:6333".to_string())
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_create_timeout_secs() -> u64 {
    10
}

fn default_upsert_timeout_secs() -> u64 {
    15
}

fn default_readiness() -> RetryPolicy {
    RetryPolicy::fixed(30, Duration::from_secs(1))
}

fn default_upsert_retry() -> RetryPolicy {
    RetryPolicy::linear(3, Duration::from_millis(500))
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackendKind::default(),
            url: default_url(),
            timeout_secs: default_timeout_secs(),
            create_timeout_secs: default_create_timeout_secs(),
            upsert_timeout_secs: default_upsert_timeout_secs(),
            readiness: default_readiness(),
            upsert_retry: default_upsert_retry(),
        }
    }
}

impl IndexConfig {
    pub fn in_memory() -> Self {
        Self {
            backend: IndexBackendKind::InMemory,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if self.backend == IndexBackendKind::Qdrant {
            match self.url.as_deref() {
                Some(url) if !url.trim().is_empty() => {}
                _ => {
                    return Err(IndexError::InvalidConfig(
                        "url is required for the qdrant backend".into(),
                    ))
                }
            }
        }
        if self.timeout_secs == 0 || self.create_timeout_secs == 0 || self.upsert_timeout_secs == 0
        {
            return Err(IndexError::InvalidConfig(
                "timeouts must be greater than 0".into(),
            ));
        }
        if self.readiness.max_attempts == 0 || self.upsert_retry.max_attempts == 0 {
            return Err(IndexError::InvalidConfig(
                "retry max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
