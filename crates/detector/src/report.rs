use chrono::{DateTime, Utc};
use index::Match;
use serde::{Deserialize, Serialize};

/// Outcome of the decision step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub plagiarized: bool,
    /// Score of the best match, 0 when there is none.
    pub similarity: f32,
}

impl Verdict {
    /// Any qualifying match flags the submission; only the top match's
    /// score is reported. `matches` must already be ranked.
    pub fn from_matches(matches: &[Match]) -> Self {
        match matches.first() {
            Some(top) => Self {
                plagiarized: true,
                similarity: top.score,
            },
            None => Self {
                plagiarized: false,
                similarity: 0.0,
            },
        }
    }
}

/// Persisted record of one analysis attempt.
///
/// A completed analysis carries `plagiarized` and `similarity`; a failed one
/// carries `error` and omits both so it cannot be read as a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub file_name: String,
    pub sender: String,
    pub work_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plagiarized: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Report {
    pub fn completed(
        file_name: impl Into<String>,
        sender: impl Into<String>,
        work_id: impl Into<String>,
        verdict: Verdict,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            sender: sender.into(),
            work_id: work_id.into(),
            plagiarized: Some(verdict.plagiarized),
            similarity: Some(verdict.similarity),
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn failed(
        file_name: impl Into<String>,
        sender: impl Into<String>,
        work_id: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            sender: sender.into(),
            work_id: work_id.into(),
            plagiarized: None,
            similarity: None,
            timestamp: Utc::now(),
            error: Some(error.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    pub fn verdict(&self) -> Option<Verdict> {
        Some(Verdict {
            plagiarized: self.plagiarized?,
            similarity: self.similarity.unwrap_or(0.0),
        })
    }
}
