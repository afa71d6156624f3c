use crate::config::ServerConfig;
use crate::source::DocumentSource;
use crate::wordcloud::WordCloudClient;
use detector::PlagiarismDetector;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Detector instance (shared across requests)
    pub detector: Arc<PlagiarismDetector>,

    /// Where submitted files are read from
    pub source: Arc<dyn DocumentSource>,

    /// Word-cloud renderer, when enabled
    pub wordcloud: Option<WordCloudClient>,

    /// Prometheus exporter handle, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        detector: Arc<PlagiarismDetector>,
        source: Arc<dyn DocumentSource>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            detector,
            source,
            wordcloud: None,
            metrics: None,
        }
    }

    pub fn with_wordcloud(mut self, wordcloud: WordCloudClient) -> Self {
        self.wordcloud = Some(wordcloud);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Server metadata for health checks
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
}
