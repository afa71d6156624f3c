use embedding::EMBEDDING_DIM;
use index::CollectionSpec;
use serde::{Deserialize, Serialize};

use crate::DetectorError;

/// Detection parameters. Immutable once handed to a detector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectorConfig {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    /// Maximum neighbors fetched per search.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Minimum score for a neighbor to count as a plagiarism signal.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
    /// Save an error-tagged report when an analysis fails.
    #[serde(default = "default_record_failures")]
    pub record_failures: bool,
}

fn default_collection() -> String {
    "documents".to_string()
}

fn default_dimension() -> usize {
    EMBEDDING_DIM
}

fn default_top_k() -> usize {
    5
}

fn default_score_threshold() -> f32 {
    0.7
}

fn default_record_failures() -> bool {
    true
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            dimension: default_dimension(),
            top_k: default_top_k(),
            score_threshold: default_score_threshold(),
            record_failures: default_record_failures(),
        }
    }
}

impl DetectorConfig {
    pub fn collection_spec(&self) -> CollectionSpec {
        CollectionSpec::cosine(self.collection.clone(), self.dimension)
    }

    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.collection.trim().is_empty() {
            return Err(DetectorError::InvalidConfig(
                "collection name must not be empty".into(),
            ));
        }
        if self.dimension == 0 {
            return Err(DetectorError::InvalidConfig(
                "dimension must be greater than 0".into(),
            ));
        }
        if self.top_k == 0 {
            return Err(DetectorError::InvalidConfig(
                "top_k must be greater than 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(DetectorError::InvalidConfig(format!(
                "score_threshold must be within [0, 1], got {}",
                self.score_threshold
            )));
        }
        Ok(())
    }
}
