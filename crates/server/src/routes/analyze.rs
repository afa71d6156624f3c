use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use detector::Submission;
use index::Match;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Request to analyze a stored file
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub work_id: String,
}

impl AnalyzeRequest {
    fn validate(&self) -> ServerResult<()> {
        let missing: Vec<&str> = [
            ("file_name", &self.file_name),
            ("sender", &self.sender),
            ("work_id", &self.work_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ServerError::BadRequest(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Verdict for one submission
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub file_name: String,
    pub sender: String,
    pub work_id: String,
    pub plagiarized: bool,
    /// Score of the best qualifying match, 0 when there is none.
    pub similarity: f32,
    pub matches: Vec<Match>,
    pub report_persisted: bool,
    /// Soft failures that did not affect the verdict.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Base64-encoded PNG, when word clouds are enabled and rendering worked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wordcloud_png: Option<String>,
}

/// Analyze a submitted file.
///
/// Reads `file_name` from the document source, runs it through the detector
/// and answers with the verdict. A failed analysis is a 502 carrying the
/// failing stage, never a `plagiarized: false`.
///
/// # Example
/// ```json
/// // Request
/// {"file_name": "essay.txt", "sender": "alice", "work_id": "W1"}
///
/// // Response
/// {
///   "file_name": "essay.txt",
///   "sender": "alice",
///   "work_id": "W1",
///   "plagiarized": true,
///   "similarity": 0.93,
///   "matches": [{"id": 42, "file_name": "bob.txt", "sender": "bob", "score": 0.93}],
///   "report_persisted": true
/// }
/// ```
pub async fn analyze(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ServerResult<Json<AnalyzeResponse>> {
    let Json(request) = payload.map_err(|rejection| ServerError::BadRequest(rejection.body_text()))?;
    request.validate()?;

    let text = state.source.fetch(&request.file_name).await?;
    let submission = Submission::new(request.sender, request.work_id, request.file_name, text);
    // Detached so a dropped request cannot cancel retries mid-sequence.
    let detector = state.detector.clone();
    let (submission, outcome) = tokio::spawn(async move {
        let outcome = detector.analyze(&submission).await;
        (submission, outcome)
    })
    .await?;
    let analysis = outcome?;

    let mut warnings = Vec::new();
    if !analysis.persisted {
        warnings.push("report could not be persisted".to_string());
    }

    let wordcloud_png = match &state.wordcloud {
        Some(cloud) => match cloud.render(&submission.text).await {
            Ok(png) => Some(BASE64_STANDARD.encode(png)),
            Err(err) => {
                warn!(file_name = %submission.file_name, error = %err, "word cloud failed");
                warnings.push(format!("word cloud unavailable: {err}"));
                None
            }
        },
        None => None,
    };

    Ok(Json(AnalyzeResponse {
        file_name: submission.file_name,
        sender: submission.sender,
        work_id: submission.work_id,
        plagiarized: analysis.verdict.plagiarized,
        similarity: analysis.verdict.similarity,
        matches: analysis.matches,
        report_persisted: analysis.persisted,
        warnings,
        wordcloud_png,
    }))
}
