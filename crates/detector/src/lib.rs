//! # plagscan detector
//!
//! Decides whether a submitted document is a near duplicate of another
//! sender's submission for the same work, and keeps a durable record of
//! every decision.
//!
//! [`PlagiarismDetector`] drives one submission through four steps:
//!
//! 1. embed the text with an [`EmbeddingProvider`](embedding::EmbeddingProvider),
//! 2. upsert the vector into the index under an id derived from
//!    `(sender, work_id, file_name)`,
//! 3. search the same work for neighbors, excluding the submitter,
//! 4. flag the submission if any neighbor scores at or above the threshold.
//!
//! The outcome is appended to a [`ReportStore`]. Persistence is best effort:
//! a failed save is logged and surfaced as [`Analysis::persisted`], never as a
//! changed verdict. A failure in steps 1 to 3 aborts with [`AnalysisFailed`],
//! which callers can always tell apart from a clean "not plagiarized".
//!
//! ```
//! use detector::{DetectorConfig, PlagiarismDetector, ReportStore, Submission};
//! use embedding::{HashEmbeddingProvider, EMBEDDING_DIM};
//! use index::InMemoryIndex;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let detector = PlagiarismDetector::new(
//!     Arc::new(HashEmbeddingProvider::new(EMBEDDING_DIM)),
//!     Arc::new(InMemoryIndex::new()),
//!     Arc::new(ReportStore::in_memory()),
//!     DetectorConfig::default(),
//! )
//! .unwrap();
//! detector.bootstrap().await.unwrap();
//!
//! let first = detector.analyze(&Submission::new("A", "W1", "a.txt", "alpha")).await.unwrap();
//! assert!(!first.verdict.plagiarized);
//!
//! let copy = detector.analyze(&Submission::new("B", "W1", "b.txt", "alpha")).await.unwrap();
//! assert!(copy.verdict.plagiarized);
//! assert_eq!(copy.matches[0].sender, "A");
//! # }
//! ```

mod backend;
mod config;
mod detector;
mod error;
pub mod metrics;
mod report;
mod store;

pub use crate::backend::{DirectoryBackend, InMemoryBackend, ReportBackend, ReportBackendConfig};
#[cfg(feature = "backend-redb")]
pub use crate::backend::RedbBackend;
pub use crate::config::DetectorConfig;
pub use crate::detector::{Analysis, PlagiarismDetector, Submission};
pub use crate::error::{AnalysisFailed, DetectorError, FailureCause, ReportStoreError, Stage};
pub use crate::metrics::{DetectionMetrics, Outcome};
pub use crate::report::{Report, Verdict};
pub use crate::store::ReportStore;
