use plagscan::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds for every route except `/analyze`, which
    /// runs until its retries complete or are exhausted.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Where submitted files are read from
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub wordcloud: WordCloudConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Location of submitted documents.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Files live in a local (usually shared) directory.
    LocalDir {
        #[serde(default = "default_source_dir")]
        path: PathBuf,
    },
    /// Files are fetched from the file-storage service with
    /// `GET {url}/files/{name}`.
    Http {
        url: String,
        #[serde(default = "default_source_timeout_secs")]
        timeout_secs: u64,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::LocalDir {
            path: default_source_dir(),
        }
    }
}

/// Word-cloud rendering through a QuickChart-compatible endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WordCloudConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_wordcloud_url")]
    pub url: String,
    #[serde(default = "default_wordcloud_width")]
    pub width: u32,
    #[serde(default = "default_wordcloud_height")]
    pub height: u32,
    /// Number of keywords sent to the renderer.
    #[serde(default = "default_wordcloud_keywords")]
    pub max_keywords: usize,
    #[serde(default = "default_wordcloud_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WordCloudConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_wordcloud_url(),
            width: default_wordcloud_width(),
            height: default_wordcloud_height(),
            max_keywords: default_wordcloud_keywords(),
            timeout_secs: default_wordcloud_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            source: SourceConfig::default(),
            wordcloud: WordCloudConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `plagscan` config file and
    /// `PLAGSCAN_*` environment variables (`__` separates nested keys, e.g.
    /// `PLAGSCAN_PIPELINE__INDEX__URL`).
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }

        let builder = config::Config::builder()
            .add_source(config::File::with_name("plagscan").required(false))
            .add_source(
                config::Environment::with_prefix("PLAGSCAN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.pipeline.validate()?;
        Ok(config)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8002
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_body_size_mb() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("/files")
}

fn default_source_timeout_secs() -> u64 {
    10
}

fn default_wordcloud_url() -> String {
    "https://quickchart.io/wordcloud".to_string()
}

fn default_wordcloud_width() -> u32 {
    800
}

fn default_wordcloud_height() -> u32 {
    600
}

fn default_wordcloud_keywords() -> usize {
    30
}

fn default_wordcloud_timeout_secs() -> u64 {
    10
}
