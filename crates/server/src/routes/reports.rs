use crate::error::ServerResult;
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::Json;
use detector::Report;
use std::sync::Arc;

/// All reports recorded for a work, oldest first.
///
/// A work without reports answers `[]`, not 404.
pub async fn list_reports(
    State(state): State<Arc<ServerState>>,
    Path(work_id): Path<String>,
) -> ServerResult<Json<Vec<Report>>> {
    let store = Arc::clone(state.detector.reports());
    let mut reports = tokio::task::spawn_blocking(move || store.list_by_work(&work_id)).await??;
    reports.sort_by_key(|report| report.timestamp);
    Ok(Json(reports))
}
