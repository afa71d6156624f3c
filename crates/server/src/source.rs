//! Where submitted documents are read from.
//!
//! Submissions reference a file by name only. The service either reads it
//! from a directory it shares with the file-storage service, or asks that
//! service for it over HTTP.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::SourceConfig;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("file not found: {0}")]
    NotFound(String),
    /// Names must be a plain base name; anything that could escape the
    /// source root is refused.
    #[error("invalid file name: {0:?}")]
    InvalidName(String),
    #[error("failed to read {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("file storage error: {0}")]
    Unavailable(String),
}

/// Fetches the text of a submitted file.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, file_name: &str) -> Result<String, SourceError>;

    fn name(&self) -> &'static str;
}

pub fn build_source(cfg: &SourceConfig) -> Result<Arc<dyn DocumentSource>, SourceError> {
    let source: Arc<dyn DocumentSource> = match cfg {
        SourceConfig::LocalDir { path } => Arc::new(LocalDirSource::new(path)),
        SourceConfig::Http { url, timeout_secs } => Arc::new(HttpSource::new(
            url.clone(),
            Duration::from_secs(*timeout_secs),
        )?),
    };
    Ok(source)
}

fn check_name(file_name: &str) -> Result<&str, SourceError> {
    let is_base_name = !file_name.is_empty()
        && file_name != "."
        && file_name != ".."
        && !file_name.contains(['/', '\\', '\0']);
    if is_base_name {
        Ok(file_name)
    } else {
        Err(SourceError::InvalidName(file_name.to_string()))
    }
}

/// Reads files from a local directory.
#[derive(Debug, Clone)]
pub struct LocalDirSource {
    root: PathBuf,
}

impl LocalDirSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl DocumentSource for LocalDirSource {
    async fn fetch(&self, file_name: &str) -> Result<String, SourceError> {
        let path = self.root.join(check_name(file_name)?);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(SourceError::NotFound(file_name.to_string()))
            }
            Err(source) => Err(SourceError::Io {
                name: file_name.to_string(),
                source,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "local_dir"
    }
}

/// Fetches files from the file-storage service.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn fetch(&self, file_name: &str) -> Result<String, SourceError> {
        let url = format!("{}/files/{}", self.base_url, check_name(file_name)?);
        debug!(url = %url, "fetching submission");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(file_name.to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!(
                "status {}",
                status.as_u16()
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
