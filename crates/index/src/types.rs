use chrono::{DateTime, Utc};
use embedding::EmbeddingVector;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;

use crate::filter::{Filter, PayloadField};

/// Stable point identifier, always within `0..=i64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(u64);

impl PointId {
    const MASK: u64 = 0x7FFF_FFFF_FFFF_FFFF;

    /// Derives the id of a `(sender, work_id, file_name)` triple.
    ///
    /// SHA-256 over the unit-separator joined fields; the first eight bytes,
    /// read big-endian, with the sign bit cleared. Re-submitting the same
    /// triple always lands on the same point.
    pub fn derive(sender: &str, work_id: &str, file_name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(sender.as_bytes());
        hasher.update([0x1f]);
        hasher.update(work_id.as_bytes());
        hasher.update([0x1f]);
        hasher.update(file_name.as_bytes());
        let digest = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        Self(u64::from_be_bytes(head) & Self::MASK)
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw & Self::MASK)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An indexed document embedding with its identifying metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPoint {
    pub id: PointId,
    pub vector: EmbeddingVector,
    pub sender: String,
    pub work_id: String,
    pub file_name: String,
    pub inserted_at: DateTime<Utc>,
}

impl DocumentPoint {
    /// Builds a point with its id derived from the identity triple.
    pub fn new(
        vector: EmbeddingVector,
        sender: impl Into<String>,
        work_id: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        let sender = sender.into();
        let work_id = work_id.into();
        let file_name = file_name.into();
        Self {
            id: PointId::derive(&sender, &work_id, &file_name),
            vector,
            sender,
            work_id,
            file_name,
            inserted_at: Utc::now(),
        }
    }

    pub(crate) fn field(&self, field: PayloadField) -> &str {
        match field {
            PayloadField::Sender => &self.sender,
            PayloadField::WorkId => &self.work_id,
            PayloadField::FileName => &self.file_name,
        }
    }
}

/// A neighbor returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: PointId,
    pub file_name: String,
    pub sender: String,
    /// Similarity; in `[0, 1]` for cosine on non-negative usable ranges.
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inserted_at: Option<DateTime<Utc>>,
}

/// Similarity metric of a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    #[default]
    Cosine,
    Dot,
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distance::Cosine => f.write_str("Cosine"),
            Distance::Dot => f.write_str("Dot"),
        }
    }
}

/// Name, dimension and metric of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: usize,
    pub distance: Distance,
}

impl CollectionSpec {
    pub fn cosine(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            distance: Distance::Cosine,
        }
    }
}

/// A nearest-neighbor query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub vector: EmbeddingVector,
    pub filter: Filter,
    pub limit: usize,
    pub score_threshold: f32,
}

impl SearchQuery {
    /// Neighbors within `work_id` submitted by anyone but `exclude_sender`.
    pub fn neighbors(
        vector: EmbeddingVector,
        work_id: &str,
        exclude_sender: &str,
        limit: usize,
        score_threshold: f32,
    ) -> Self {
        Self {
            vector,
            filter: Filter::new()
                .must(PayloadField::WorkId, work_id)
                .must_not(PayloadField::Sender, exclude_sender),
            limit,
            score_threshold,
        }
    }
}

/// Orders by descending score, then earliest insertion; undated matches
/// sort after dated ones at equal score.
pub fn compare_matches(a: &Match, b: &Match) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| match (a.inserted_at, b.inserted_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Applies the query's threshold, exclusion and limit to raw backend
/// results and puts them in canonical order.
pub fn rank_matches(mut matches: Vec<Match>, query: &SearchQuery) -> Vec<Match> {
    matches.retain(|m| m.score >= query.score_threshold && query.filter.admits_match(m));
    matches.sort_by(compare_matches);
    matches.truncate(query.limit);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn vector() -> EmbeddingVector {
        EmbeddingVector::new(vec![1.0, 0.0], 2).unwrap()
    }

    fn at(secs: i64) -> Option<DateTime<Utc>> {
        Some(Utc.timestamp_opt(secs, 0).unwrap())
    }

    fn m(sender: &str, score: f32, inserted_at: Option<DateTime<Utc>>) -> Match {
        Match {
            id: PointId::derive(sender, "W1", "f.txt"),
            file_name: "f.txt".into(),
            sender: sender.into(),
            score,
            inserted_at,
        }
    }

    #[test]
    fn point_id_is_deterministic() {
        let a = PointId::derive("A", "W1", "essay.txt");
        let b = PointId::derive("A", "W1", "essay.txt");
        assert_eq!(a, b);
    }

    #[test]
    fn point_id_distinguishes_triples() {
        let a = PointId::derive("A", "W1", "essay.txt");
        assert_ne!(a, PointId::derive("B", "W1", "essay.txt"));
        assert_ne!(a, PointId::derive("A", "W2", "essay.txt"));
        assert_ne!(a, PointId::derive("A", "W1", "other.txt"));
    }

    #[test]
    fn point_id_separator_prevents_field_bleed() {
        assert_ne!(
            PointId::derive("ab", "c", "d"),
            PointId::derive("a", "bc", "d")
        );
    }

    #[test]
    fn point_id_is_positive_i64() {
        for sender in ["A", "B", "C", "D", "E", "F", "G", "H"] {
            let id = PointId::derive(sender, "W", "f");
            assert!(id.get() <= i64::MAX as u64);
        }
        assert_eq!(PointId::from_raw(u64::MAX).get(), i64::MAX as u64);
    }

    #[test]
    fn document_point_derives_id() {
        let p = DocumentPoint::new(vector(), "A", "W1", "essay.txt");
        assert_eq!(p.id, PointId::derive("A", "W1", "essay.txt"));
        assert_eq!(p.field(PayloadField::WorkId), "W1");
    }

    #[test]
    fn rank_orders_by_score_then_insertion() {
        let query = SearchQuery::neighbors(vector(), "W1", "Z", 5, 0.7);
        let ranked = rank_matches(
            vec![
                m("late", 0.9, at(20)),
                m("low", 0.75, at(1)),
                m("early", 0.9, at(10)),
                m("undated", 0.9, None),
            ],
            &query,
        );
        let senders: Vec<_> = ranked.iter().map(|m| m.sender.as_str()).collect();
        assert_eq!(senders, vec!["early", "late", "undated", "low"]);
    }

    #[test]
    fn rank_applies_threshold_limit_and_exclusion() {
        let query = SearchQuery::neighbors(vector(), "W1", "A", 2, 0.7);
        let ranked = rank_matches(
            vec![
                m("A", 0.99, at(1)),
                m("B", 0.69, at(2)),
                m("C", 0.8, at(3)),
                m("D", 0.85, at(4)),
                m("E", 0.7, at(5)),
            ],
            &query,
        );
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|m| m.sender != "A" && m.score >= 0.7));
        assert_eq!(ranked[0].sender, "D");
        assert_eq!(ranked[1].sender, "C");
    }

    #[test]
    fn match_serializes_id_as_number() {
        let json = serde_json::to_value(m("B", 1.0, None)).unwrap();
        assert!(json["id"].is_u64());
        assert!(json.get("inserted_at").is_none());
    }
}
