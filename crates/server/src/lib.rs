//! plagscan server - HTTP API for submission analysis
//!
//! Exposes the detector over HTTP. A client names an already stored file;
//! the server reads it, decides whether it duplicates another sender's
//! submission for the same work, records a report and answers with the
//! verdict.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `POST /analyze` - Analyze `{file_name, sender, work_id}`
//! - `GET /reports/{work_id}` - Reports recorded for a work
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics
//! - `GET /metadata` - Server version and uptime
//!
//! Errors are JSON `{"error": {"code", "message", "details"}}`. A failed
//! analysis is `502 ANALYSIS_FAILED` with the failing stage in `details`.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod source;
pub mod state;
pub mod telemetry;
pub mod wordcloud;

pub use crate::config::{ServerConfig, SourceConfig, WordCloudConfig};
pub use crate::error::{ServerError, ServerResult};
pub use crate::server::{build_router, start_server};
pub use crate::source::{DocumentSource, HttpSource, LocalDirSource, SourceError};
pub use crate::state::ServerState;
pub use crate::wordcloud::{extract_keywords, WordCloudClient, WordCloudError};
