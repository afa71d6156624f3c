use embedding::{EmbeddingError, EmbeddingProvider};
use index::{DocumentPoint, IndexError, Match, PointId, SearchQuery, VectorIndex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::metrics::{DetectionMetrics, Outcome};
use crate::{
    AnalysisFailed, DetectorConfig, DetectorError, FailureCause, Report, ReportStore, Stage,
    Verdict,
};

/// A document submitted for a work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub sender: String,
    pub work_id: String,
    pub file_name: String,
    pub text: String,
}

impl Submission {
    pub fn new(
        sender: impl Into<String>,
        work_id: impl Into<String>,
        file_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            work_id: work_id.into(),
            file_name: file_name.into(),
            text: text.into(),
        }
    }
}

/// A completed analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub report: Report,
    pub verdict: Verdict,
    /// Qualifying neighbors, best first.
    pub matches: Vec<Match>,
    pub point_id: PointId,
    /// Whether the report reached the store. Never affects the verdict.
    pub persisted: bool,
}

/// Decides whether a submission duplicates another sender's work.
///
/// Each call to [`analyze`](Self::analyze) runs embed, index, query and
/// decide once, then records the outcome. Retries happen only inside the
/// embedding and index clients; the pipeline as a whole is a single attempt.
/// The detector keeps no state between submissions.
pub struct PlagiarismDetector {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    reports: Arc<ReportStore>,
    config: DetectorConfig,
    metrics: Option<Arc<dyn DetectionMetrics>>,
}

impl PlagiarismDetector {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        reports: Arc<ReportStore>,
        config: DetectorConfig,
    ) -> Result<Self, DetectorError> {
        config.validate()?;
        if embedder.dimension() != config.dimension {
            return Err(DetectorError::DimensionMismatch {
                provider: embedder.name(),
                provider_dimension: embedder.dimension(),
                collection_dimension: config.dimension,
            });
        }
        Ok(Self {
            embedder,
            index,
            reports,
            config,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn DetectionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn reports(&self) -> &Arc<ReportStore> {
        &self.reports
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Ensures the configured collection exists.
    pub async fn bootstrap(&self) -> Result<(), IndexError> {
        let spec = self.config.collection_spec();
        self.index.ensure_collection(&spec).await?;
        info!(
            collection = %spec.name,
            dimension = spec.dimension,
            index = self.index.name(),
            "collection ready"
        );
        Ok(())
    }

    /// Runs one submission through the pipeline.
    pub async fn analyze(&self, submission: &Submission) -> Result<Analysis, AnalysisFailed> {
        let started = Instant::now();
        match self.run(submission).await {
            Ok((point_id, matches)) => {
                let verdict = Verdict::from_matches(&matches);
                let report = Report::completed(
                    &submission.file_name,
                    &submission.sender,
                    &submission.work_id,
                    verdict,
                );
                let persisted = self.persist(report.clone()).await;
                info!(
                    sender = %submission.sender,
                    work_id = %submission.work_id,
                    file_name = %submission.file_name,
                    plagiarized = verdict.plagiarized,
                    similarity = verdict.similarity,
                    matches = matches.len(),
                    persisted,
                    "analysis completed"
                );
                let outcome = if verdict.plagiarized {
                    Outcome::Plagiarized
                } else {
                    Outcome::Original
                };
                self.observe(outcome, started, matches.len());
                Ok(Analysis {
                    report,
                    verdict,
                    matches,
                    point_id,
                    persisted,
                })
            }
            Err((stage, cause)) => {
                error!(
                    sender = %submission.sender,
                    work_id = %submission.work_id,
                    file_name = %submission.file_name,
                    stage = %stage,
                    error = %cause,
                    "analysis failed"
                );
                let recorded = if self.config.record_failures {
                    let report = Report::failed(
                        &submission.file_name,
                        &submission.sender,
                        &submission.work_id,
                        format!("{stage}: {cause}"),
                    );
                    self.persist(report).await
                } else {
                    false
                };
                self.observe(Outcome::Failed(stage), started, 0);
                Err(AnalysisFailed {
                    stage,
                    cause,
                    recorded,
                })
            }
        }
    }

    async fn run(&self, submission: &Submission) -> Result<(PointId, Vec<Match>), (Stage, FailureCause)> {
        let vector = self
            .embedder
            .embed(&submission.text)
            .await
            .map_err(|e| (Stage::Embedding, e.into()))?;
        if vector.len() != self.config.dimension {
            let mismatch = EmbeddingError::DimensionMismatch {
                expected: self.config.dimension,
                actual: vector.len(),
            };
            return Err((Stage::Embedding, mismatch.into()));
        }

        let point = DocumentPoint::new(
            vector,
            &submission.sender,
            &submission.work_id,
            &submission.file_name,
        );
        let point_id = self
            .index
            .upsert(&self.config.collection, &point)
            .await
            .map_err(|e| (Stage::IndexWrite, e.into()))?;
        debug!(id = %point_id, "document indexed");

        let query = SearchQuery::neighbors(
            point.vector,
            &submission.work_id,
            &submission.sender,
            self.config.top_k,
            self.config.score_threshold,
        );
        let matches = self
            .index
            .search(&self.config.collection, &query)
            .await
            .map_err(|e| (Stage::IndexSearch, e.into()))?;

        Ok((point_id, matches))
    }

    /// Best-effort save; a failure is logged and reported as `false`.
    async fn persist(&self, report: Report) -> bool {
        let store = Arc::clone(&self.reports);
        let saved = tokio::task::spawn_blocking(move || store.save(&report)).await;
        let err = match saved {
            Ok(Ok(_key)) => return true,
            Ok(Err(err)) => err.to_string(),
            Err(join) => join.to_string(),
        };
        warn!(error = %err, "failed to persist report");
        if let Some(metrics) = &self.metrics {
            metrics.record_persistence_failure();
        }
        false
    }

    fn observe(&self, outcome: Outcome, started: Instant, match_count: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.record_analysis(outcome, started.elapsed(), match_count);
        }
    }
}
