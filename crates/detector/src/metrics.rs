// Metrics hooks for the detector.
//
// A `DetectionMetrics` observer is handed to `PlagiarismDetector` at
// construction; the detector reports every analysis outcome to it. This keeps
// instrumentation decoupled from any specific metrics backend.
use std::time::Duration;

use crate::Stage;

/// How an analysis ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Plagiarized,
    Original,
    Failed(Stage),
}

impl Outcome {
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Plagiarized => "plagiarized",
            Outcome::Original => "original",
            Outcome::Failed(_) => "failed",
        }
    }
}

/// Metrics observer for detector operations.
pub trait DetectionMetrics: Send + Sync {
    /// Record one analysis. `match_count` is the number of qualifying
    /// neighbors, 0 for failures.
    fn record_analysis(&self, outcome: Outcome, latency: Duration, match_count: usize);

    /// Record a report that could not be persisted.
    fn record_persistence_failure(&self) {}
}
