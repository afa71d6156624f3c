use async_trait::async_trait;
use resilience::{with_retry, RetryError, RetryPolicy, Sleeper, TokioSleeper, Transient};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{EmbeddingConfig, EmbeddingError, EmbeddingProvider, EmbeddingVector};

#[derive(Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f64>,
}

/// Outcome of a single attempt. Only transport failures are retried.
enum AttemptError {
    Transport(reqwest::Error),
    Failed(EmbeddingError),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Transport(err) => write!(f, "{err}"),
            AttemptError::Failed(err) => write!(f, "{err}"),
        }
    }
}

impl Transient for AttemptError {
    fn is_transient(&self) -> bool {
        matches!(self, AttemptError::Transport(_))
    }
}

impl From<RetryError<AttemptError>> for EmbeddingError {
    fn from(err: RetryError<AttemptError>) -> Self {
        let attempts = err.attempts();
        match err.into_inner() {
            AttemptError::Transport(source) => EmbeddingError::ProviderUnavailable {
                attempts,
                message: source.to_string(),
            },
            AttemptError::Failed(inner) => inner,
        }
    }
}

/// Embedding provider backed by a remote HTTP service.
///
/// Sends `POST {url}` with `{"text": ...}` and expects
/// `{"embedding": [f64; dimension]}` back. Connection failures and timeouts
/// are retried according to the configured [`RetryPolicy`]; any answer from
/// the service, including an error status, is final.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    url: String,
    dimension: usize,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl fmt::Debug for HttpEmbeddingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpEmbeddingProvider")
            .field("url", &self.url)
            .field("dimension", &self.dimension)
            .field("retry", &self.retry)
            .finish()
    }
}

impl HttpEmbeddingProvider {
    pub fn new(
        url: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            dimension,
            retry: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn from_config(cfg: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let url = cfg
            .api_url
            .as_deref()
            .ok_or_else(|| EmbeddingError::InvalidConfig("api_url is required in http mode".into()))?;
        Ok(Self::new(url, cfg.dimension, cfg.timeout())?.with_retry_policy(cfg.retry))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request_once(&self, text: &str, attempt: u32) -> Result<Vec<f64>, AttemptError> {
        debug!(url = %self.url, attempt, "requesting embedding");
        let response = self
            .client
            .post(&self.url)
            .json(&EmbedRequest { text })
            .send()
            .await
            .map_err(AttemptError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AttemptError::Failed(EmbeddingError::Rejected {
                status: status.as_u16(),
                message,
            }));
        }

        let body = response.bytes().await.map_err(AttemptError::Transport)?;
        let parsed: EmbedResponse = serde_json::from_slice(&body).map_err(|e| {
            AttemptError::Failed(EmbeddingError::InvalidResponse(e.to_string()))
        })?;
        Ok(parsed.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let values = with_retry(&self.retry, self.sleeper.as_ref(), move |attempt| {
            self.request_once(text, attempt)
        })
        .await
        .map_err(|err| {
            let err = EmbeddingError::from(err);
            warn!(url = %self.url, error = %err, "embedding request failed");
            err
        })?;

        EmbeddingVector::from_f64(&values, self.dimension)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
