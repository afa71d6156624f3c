//! YAML configuration for the detection pipeline.
//!
//! One file describes every component. Sections that are left out fall back
//! to their defaults, which target the containerised deployment
//! (`http://embeddings:8003/embed`, `http://qdrant:6333`).
//!
//! ## Example
//!
//! ```yaml
//! version: "1.0"
//! name: "course-2024"
//!
//! embedding:
//!   mode: http
//!   api_url: "http://embeddings:8003/embed"
//!   dimension: 384
//!   timeout_secs: 60
//!   retry:
//!     max_attempts: 3
//!     backoff: { kind: linear, step_ms: 1000 }
//!
//! index:
//!   backend: qdrant
//!   url: "http://qdrant:6333"
//!   upsert_timeout_secs: 15
//!
//! detector:
//!   collection: "documents"
//!   top_k: 5
//!   score_threshold: 0.7
//!
//! reports:
//!   backend: directory
//!   path: "/files/reports"
//! ```

use std::fs;
use std::path::Path;

use detector::{DetectorConfig, ReportBackendConfig};
use embedding::EmbeddingConfig;
use index::IndexConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading a pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub reports: ReportBackendConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: None,
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            detector: DetectorConfig::default(),
            reports: ReportBackendConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }

        let invalid = |e: &dyn std::fmt::Display| ConfigLoadError::Validation(e.to_string());
        self.embedding.validate().map_err(|e| invalid(&e))?;
        self.index.validate().map_err(|e| invalid(&e))?;
        self.detector.validate().map_err(|e| invalid(&e))?;

        if self.embedding.dimension != self.detector.dimension {
            return Err(ConfigLoadError::Validation(format!(
                "embedding.dimension ({}) must equal detector.dimension ({})",
                self.embedding.dimension, self.detector.dimension
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedding::EmbeddingMode;
    use index::IndexBackendKind;
    use resilience::{Backoff, RetryPolicy};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_document_uses_defaults() {
        let config = PipelineConfig::from_yaml("version: \"1.0\"\n").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.embedding.mode, EmbeddingMode::Http);
        assert_eq!(config.index.backend, IndexBackendKind::Qdrant);
        assert_eq!(config.detector.score_threshold, 0.7);
        assert_eq!(config.reports, ReportBackendConfig::InMemory);
    }

    #[test]
    fn parses_full_document() {
        let yaml = r#"
version: "1.0"
name: "course"
embedding:
  mode: hash
  dimension: 64
  retry:
    max_attempts: 5
    backoff: { kind: exponential, base_ms: 100, max_ms: 800 }
index:
  backend: in_memory
detector:
  collection: "essays"
  dimension: 64
  top_k: 3
  score_threshold: 0.9
  record_failures: false
reports:
  backend: directory
  path: "/tmp/reports"
"#;

        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.name.as_deref(), Some("course"));
        assert_eq!(config.embedding.mode, EmbeddingMode::Hash);
        assert_eq!(
            config.embedding.retry,
            RetryPolicy::new(
                5,
                Backoff::Exponential {
                    base: Duration::from_millis(100),
                    max: Duration::from_millis(800),
                }
            )
        );
        assert_eq!(config.index.backend, IndexBackendKind::InMemory);
        assert_eq!(config.detector.collection, "essays");
        assert_eq!(config.detector.top_k, 3);
        assert!(!config.detector.record_failures);
        assert_eq!(config.reports, ReportBackendConfig::directory("/tmp/reports"));
    }

    #[test]
    fn load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"version: \"1\"\nindex:\n  backend: in_memory\n")
            .unwrap();

        let config = PipelineConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.index.backend, IndexBackendKind::InMemory);
    }

    #[test]
    fn rejects_unknown_version() {
        let err = PipelineConfig::from_yaml("version: \"2.0\"\n").unwrap_err();
        assert!(matches!(err, ConfigLoadError::UnsupportedVersion(v) if v == "2.0"));
    }

    #[test]
    fn rejects_invalid_sections() {
        for yaml in [
            "detector:\n  top_k: 0\n",
            "detector:\n  score_threshold: 1.5\n",
            "embedding:\n  mode: http\n  api_url: null\n",
            "index:\n  backend: qdrant\n  url: \"\"\n",
            "embedding:\n  retry:\n    max_attempts: 0\n    backoff: { kind: fixed, delay_ms: 10 }\n",
        ] {
            let err = PipelineConfig::from_yaml(yaml).unwrap_err();
            assert!(matches!(err, ConfigLoadError::Validation(_)), "{yaml}: {err}");
        }
    }

    #[test]
    fn rejects_dimension_disagreement() {
        let yaml = "embedding:\n  mode: hash\n  dimension: 128\n";
        let err = PipelineConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("must equal detector.dimension"));
    }
}
