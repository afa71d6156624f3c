//! Prometheus metrics for the HTTP surface and the detector.

use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::IntoResponse;
use detector::{DetectionMetrics, Outcome};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

const EXPONENTIAL_SECONDS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Installs the global Prometheus recorder.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets(EXPONENTIAL_SECONDS)?
        .install_recorder()
}

/// Forwards detector outcomes to the `metrics` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusDetectionMetrics;

impl DetectionMetrics for PrometheusDetectionMetrics {
    fn record_analysis(&self, outcome: Outcome, latency: Duration, match_count: usize) {
        let stage = match outcome {
            Outcome::Failed(stage) => stage.as_str(),
            _ => "none",
        };
        let labels = [("outcome", outcome.label()), ("stage", stage)];
        metrics::counter!("plagscan_analyses_total", &labels).increment(1);
        metrics::histogram!("plagscan_analysis_duration_seconds", &labels)
            .record(latency.as_secs_f64());
        metrics::histogram!("plagscan_analysis_matches").record(match_count as f64);
    }

    fn record_persistence_failure(&self) {
        metrics::counter!("plagscan_report_persist_failures_total").increment(1);
    }
}

/// Records request counts and latencies per route.
pub async fn track_metrics(request: Request, next: Next) -> impl IntoResponse {
    let start = Instant::now();
    let path = match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_owned(),
        None => "unmatched".to_owned(),
    };
    let method = request.method().clone();

    let response = next.run(request).await;

    let labels = [
        ("method", method.to_string()),
        ("path", path),
        ("status", response.status().as_u16().to_string()),
    ];
    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_requests_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());

    response
}
