//! End-to-end detector behaviour over the local embedding provider and the
//! in-memory index.

use async_trait::async_trait;
use detector::{
    DetectionMetrics, DetectorConfig, DetectorError, FailureCause, Outcome, PlagiarismDetector,
    ReportBackend, ReportStore, ReportStoreError, Stage, Submission,
};
use embedding::{
    EmbeddingError, EmbeddingProvider, HashEmbeddingProvider, HttpEmbeddingProvider,
    EMBEDDING_DIM,
};
use index::{
    CollectionSpec, DocumentPoint, InMemoryIndex, IndexError, Match, PointId, SearchQuery,
    VectorIndex,
};
use resilience::RecordingSleeper;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Harness {
    detector: PlagiarismDetector,
    index: Arc<InMemoryIndex>,
    reports: Arc<ReportStore>,
}

async fn harness() -> Harness {
    let index = Arc::new(InMemoryIndex::new());
    let reports = Arc::new(ReportStore::in_memory());
    let detector = PlagiarismDetector::new(
        Arc::new(HashEmbeddingProvider::new(EMBEDDING_DIM)),
        index.clone(),
        reports.clone(),
        DetectorConfig::default(),
    )
    .unwrap();
    detector.bootstrap().await.unwrap();
    Harness {
        detector,
        index,
        reports,
    }
}

fn alpha(sender: &str) -> Submission {
    Submission::new(sender, "W1", format!("{sender}-essay.txt"), "alpha")
}

#[tokio::test]
async fn first_submission_is_original() {
    let h = harness().await;

    let analysis = h.detector.analyze(&alpha("A")).await.unwrap();

    assert!(!analysis.verdict.plagiarized);
    assert_eq!(analysis.verdict.similarity, 0.0);
    assert!(analysis.matches.is_empty());
    assert_eq!(analysis.report.plagiarized, Some(false));
    assert_eq!(analysis.report.similarity, Some(0.0));
    assert!(analysis.persisted);
}

#[tokio::test]
async fn identical_text_from_other_sender_is_flagged() {
    let h = harness().await;
    h.detector.analyze(&alpha("A")).await.unwrap();

    let analysis = h.detector.analyze(&alpha("B")).await.unwrap();

    assert!(analysis.verdict.plagiarized);
    assert_eq!(analysis.matches.len(), 1);
    assert_eq!(analysis.matches[0].sender, "A");
    assert_eq!(analysis.matches[0].file_name, "A-essay.txt");
    assert!((analysis.verdict.similarity - 1.0).abs() < 1e-4);
    assert_eq!(analysis.verdict.similarity, analysis.matches[0].score);
}

#[tokio::test]
async fn resubmission_never_matches_own_point() {
    let h = harness().await;
    h.detector.analyze(&alpha("A")).await.unwrap();
    h.detector.analyze(&alpha("B")).await.unwrap();

    let again = h.detector.analyze(&alpha("A")).await.unwrap();

    assert!(again.matches.iter().all(|m| m.sender != "A"));
    assert_eq!(again.matches.len(), 1);
    assert_eq!(again.matches[0].sender, "B");
    assert!(again.verdict.plagiarized);
}

#[tokio::test]
async fn lone_sender_resubmitting_is_not_flagged() {
    let h = harness().await;
    h.detector.analyze(&alpha("A")).await.unwrap();

    let again = h.detector.analyze(&alpha("A")).await.unwrap();

    assert!(!again.verdict.plagiarized);
}

#[tokio::test]
async fn same_triple_reuses_point_id() {
    let h = harness().await;

    let first = h.detector.analyze(&alpha("A")).await.unwrap();
    let second = h.detector.analyze(&alpha("A")).await.unwrap();

    assert_eq!(first.point_id, second.point_id);
    assert_eq!(first.point_id, PointId::derive("A", "W1", "A-essay.txt"));
    assert_eq!(h.index.len("documents"), 1);
}

#[tokio::test]
async fn other_works_are_not_compared() {
    let h = harness().await;
    h.detector.analyze(&alpha("A")).await.unwrap();

    let other = Submission::new("B", "W2", "b.txt", "alpha");
    let analysis = h.detector.analyze(&other).await.unwrap();

    assert!(!analysis.verdict.plagiarized);
}

#[tokio::test]
async fn unrelated_text_is_not_flagged() {
    let h = harness().await;
    h.detector.analyze(&alpha("A")).await.unwrap();

    let different = Submission::new("B", "W1", "b.txt", "a completely different essay");
    let analysis = h.detector.analyze(&different).await.unwrap();

    assert!(!analysis.verdict.plagiarized);
}

#[tokio::test]
async fn every_completed_analysis_is_reported() {
    let h = harness().await;
    let a = h.detector.analyze(&alpha("A")).await.unwrap();
    let b = h.detector.analyze(&alpha("B")).await.unwrap();

    let mut listed = h.reports.list_by_work("W1").unwrap();
    listed.sort_by_key(|r| r.timestamp);

    assert_eq!(listed, vec![a.report, b.report]);
}

#[tokio::test]
async fn unreachable_embedding_service_aborts_without_verdict() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let sleeper = Arc::new(RecordingSleeper::default());
    let provider = HttpEmbeddingProvider::new(
        format!("http://{addr}/embed"),
        EMBEDDING_DIM,
        Duration::from_secs(5),
    )
    .unwrap()
    .with_sleeper(sleeper.clone());
    let reports = Arc::new(ReportStore::in_memory());
    let index = Arc::new(InMemoryIndex::new());
    let detector = PlagiarismDetector::new(
        Arc::new(provider),
        index.clone(),
        reports.clone(),
        DetectorConfig::default(),
    )
    .unwrap();
    detector.bootstrap().await.unwrap();

    let failed = detector.analyze(&alpha("A")).await.unwrap_err();

    assert_eq!(failed.stage, Stage::Embedding);
    assert_eq!(failed.reason(), "embedding");
    assert!(matches!(
        failed.cause,
        FailureCause::Embedding(EmbeddingError::ProviderUnavailable { attempts: 3, .. })
    ));
    assert_eq!(sleeper.delays().len(), 2);
    assert!(index.is_empty("documents"));

    let listed = reports.list_by_work("W1").unwrap();
    assert_eq!(listed.len(), 1);
    assert!(failed.recorded);
    assert_eq!(listed[0].plagiarized, None);
    assert_eq!(listed[0].similarity, None);
    assert!(listed[0].error.as_deref().unwrap().starts_with("embedding:"));
}

#[tokio::test]
async fn failure_reports_can_be_disabled() {
    let reports = Arc::new(ReportStore::in_memory());
    let detector = PlagiarismDetector::new(
        Arc::new(BrokenEmbedder),
        Arc::new(InMemoryIndex::new()),
        reports.clone(),
        DetectorConfig {
            record_failures: false,
            ..Default::default()
        },
    )
    .unwrap();
    detector.bootstrap().await.unwrap();

    let failed = detector.analyze(&alpha("A")).await.unwrap_err();

    assert!(!failed.recorded);
    assert!(reports.list_by_work("W1").unwrap().is_empty());
}

struct BrokenEmbedder;

#[async_trait]
impl EmbeddingProvider for BrokenEmbedder {
    async fn embed(&self, _text: &str) -> Result<embedding::EmbeddingVector, EmbeddingError> {
        Err(EmbeddingError::DimensionMismatch {
            expected: EMBEDDING_DIM,
            actual: 12,
        })
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

/// Wraps the in-memory index and fails the selected operation.
struct FlakyIndex {
    inner: InMemoryIndex,
    fail_upsert: bool,
    fail_search: bool,
}

#[async_trait]
impl VectorIndex for FlakyIndex {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), IndexError> {
        self.inner.ensure_collection(spec).await
    }

    async fn upsert(&self, collection: &str, point: &DocumentPoint) -> Result<PointId, IndexError> {
        if self.fail_upsert {
            return Err(IndexError::UpsertRejected {
                status: 400,
                message: "bad request".into(),
            });
        }
        self.inner.upsert(collection, point).await
    }

    async fn search(&self, collection: &str, query: &SearchQuery) -> Result<Vec<Match>, IndexError> {
        if self.fail_search {
            return Err(IndexError::SearchFailed {
                status: Some(503),
                message: "overloaded".into(),
            });
        }
        self.inner.search(collection, query).await
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

async fn detector_over(index: FlakyIndex, reports: Arc<ReportStore>) -> PlagiarismDetector {
    let detector = PlagiarismDetector::new(
        Arc::new(HashEmbeddingProvider::new(EMBEDDING_DIM)),
        Arc::new(index),
        reports,
        DetectorConfig::default(),
    )
    .unwrap();
    detector.bootstrap().await.unwrap();
    detector
}

#[tokio::test]
async fn upsert_rejection_is_index_write_failure() {
    let reports = Arc::new(ReportStore::in_memory());
    let detector = detector_over(
        FlakyIndex {
            inner: InMemoryIndex::new(),
            fail_upsert: true,
            fail_search: false,
        },
        reports.clone(),
    )
    .await;

    let failed = detector.analyze(&alpha("A")).await.unwrap_err();

    assert_eq!(failed.reason(), "index-write");
    assert!(matches!(
        failed.cause,
        FailureCause::Index(IndexError::UpsertRejected { status: 400, .. })
    ));
    let listed = reports.list_by_work("W1").unwrap();
    assert_eq!(listed[0].plagiarized, None);
}

#[tokio::test]
async fn search_failure_after_upsert_is_still_a_failure() {
    let reports = Arc::new(ReportStore::in_memory());
    let detector = detector_over(
        FlakyIndex {
            inner: InMemoryIndex::new(),
            fail_upsert: false,
            fail_search: true,
        },
        reports.clone(),
    )
    .await;

    let failed = detector.analyze(&alpha("A")).await.unwrap_err();

    assert_eq!(failed.stage, Stage::IndexSearch);
    assert!(failed.to_string().contains("overloaded"));
    assert!(reports.list_by_work("W1").unwrap()[0].error.is_some());
}

struct FailingBackend;

impl ReportBackend for FailingBackend {
    fn put(&self, _key: &str, _value: &[u8]) -> Result<(), ReportStoreError> {
        Err(ReportStoreError::backend("disk full"))
    }

    fn scan(
        &self,
        _visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), ReportStoreError>,
    ) -> Result<(), ReportStoreError> {
        Err(ReportStoreError::backend("disk gone"))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

#[derive(Default)]
struct RecordingMetrics {
    outcomes: Mutex<Vec<(Outcome, usize)>>,
    persistence_failures: Mutex<usize>,
}

impl DetectionMetrics for RecordingMetrics {
    fn record_analysis(&self, outcome: Outcome, _latency: Duration, match_count: usize) {
        self.outcomes.lock().unwrap().push((outcome, match_count));
    }

    fn record_persistence_failure(&self) {
        *self.persistence_failures.lock().unwrap() += 1;
    }
}

#[tokio::test]
async fn persistence_failure_keeps_verdict() {
    let metrics = Arc::new(RecordingMetrics::default());
    let index = Arc::new(InMemoryIndex::new());
    let detector = PlagiarismDetector::new(
        Arc::new(HashEmbeddingProvider::new(EMBEDDING_DIM)),
        index,
        Arc::new(ReportStore::new(Box::new(FailingBackend))),
        DetectorConfig::default(),
    )
    .unwrap()
    .with_metrics(metrics.clone());
    detector.bootstrap().await.unwrap();

    detector.analyze(&alpha("A")).await.unwrap();
    let copy = detector.analyze(&alpha("B")).await.unwrap();

    assert!(copy.verdict.plagiarized);
    assert!(!copy.persisted);
    assert_eq!(*metrics.persistence_failures.lock().unwrap(), 2);
    assert!(detector.reports().list_by_work("W1").is_err());
}

#[tokio::test]
async fn metrics_observe_each_outcome() {
    let metrics = Arc::new(RecordingMetrics::default());
    let h = harness().await;
    let detector = PlagiarismDetector::new(
        Arc::new(HashEmbeddingProvider::new(EMBEDDING_DIM)),
        h.index.clone(),
        h.reports.clone(),
        DetectorConfig::default(),
    )
    .unwrap()
    .with_metrics(metrics.clone());

    detector.analyze(&alpha("A")).await.unwrap();
    detector.analyze(&alpha("B")).await.unwrap();

    assert_eq!(
        *metrics.outcomes.lock().unwrap(),
        vec![(Outcome::Original, 0), (Outcome::Plagiarized, 1)]
    );
}

#[tokio::test]
async fn concurrent_submissions_all_complete() {
    let h = Arc::new(harness().await);
    let mut handles = Vec::new();
    for i in 0..16 {
        let h = h.clone();
        handles.push(tokio::spawn(async move {
            let submission = Submission::new(format!("S{i}"), "W1", "essay.txt", format!("essay {i}"));
            h.detector.analyze(&submission).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(h.index.len("documents"), 16);
    assert_eq!(h.reports.list_by_work("W1").unwrap().len(), 16);
}

#[test]
fn provider_dimension_must_match_collection() {
    let err = PlagiarismDetector::new(
        Arc::new(HashEmbeddingProvider::new(128)),
        Arc::new(InMemoryIndex::new()),
        Arc::new(ReportStore::in_memory()),
        DetectorConfig::default(),
    )
    .err()
    .unwrap();

    assert_eq!(
        err,
        DetectorError::DimensionMismatch {
            provider: "hash",
            provider_dimension: 128,
            collection_dimension: 384,
        }
    );
}
