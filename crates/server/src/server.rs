//! Server initialization and routing
//!
//! This module handles the Axum server setup including:
//! - Router configuration with all API endpoints
//! - Middleware stack (request ids, logging, metrics, timeouts)
//! - Pipeline bootstrap before the listener opens
//! - Graceful shutdown handling

use crate::config::ServerConfig;
use crate::middleware::{log_requests, request_id};
use crate::routes::{analyze, health, reports};
use crate::routes::{api_info, not_found};
use crate::source::build_source;
use crate::state::ServerState;
use crate::telemetry::{install_recorder, track_metrics, PrometheusDetectionMetrics};
use crate::wordcloud::WordCloudClient;
use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use plagscan::Pipeline;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    // `/analyze` runs until its retries finish, so only these routes time out.
    let bounded = Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .route("/metadata", get(health::server_metadata))
        .route("/reports/{work_id}", get(reports::list_reports))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ));

    Router::new()
        .route("/analyze", post(analyze::analyze))
        .merge(bounded)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .layer(from_fn(track_metrics))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the plagscan HTTP server
///
/// Installs logging and metrics, wires the pipeline, waits for the vector
/// index and ensures the collection, then serves until SIGTERM or Ctrl+C.
/// A collection that cannot be ensured aborts startup.
///
/// # Example
///
/// ```rust,no_run
/// use server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     server::start_server(config).await?;
///     Ok(())
/// }
/// ```
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .init();

    let metrics_handle = if config.metrics_enabled {
        Some(install_recorder().context("installing metrics recorder")?)
    } else {
        None
    };

    let pipeline = if metrics_handle.is_some() {
        Pipeline::from_config_with_metrics(&config.pipeline, Arc::new(PrometheusDetectionMetrics))?
    } else {
        Pipeline::from_config(&config.pipeline)?
    };
    pipeline
        .bootstrap()
        .await
        .context("vector index bootstrap failed")?;

    let source = build_source(&config.source)?;
    let mut state = ServerState::new(config.clone(), pipeline.detector().clone(), source);
    if config.wordcloud.enabled {
        state = state.with_wordcloud(WordCloudClient::from_config(&config.wordcloud)?);
    }
    if let Some(handle) = metrics_handle {
        state = state.with_metrics(handle);
    }

    let app = build_router(Arc::new(state));
    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!(
        addr = %addr,
        collection = %config.pipeline.detector.collection,
        timeout_secs = config.timeout_secs,
        metrics = config.metrics_enabled,
        wordcloud = config.wordcloud.enabled,
        "Starting plagscan server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
