//! Typed payload filters.
//!
//! Serializes to the `{"must": [...], "must_not": [...]}` shape the index
//! expects, and can be evaluated locally by in-process backends.

use serde::{Deserialize, Serialize};

use crate::types::{DocumentPoint, Match};

/// Payload keys a filter may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadField {
    Sender,
    WorkId,
    FileName,
}

impl PayloadField {
    pub fn key(self) -> &'static str {
        match self {
            PayloadField::Sender => "sender",
            PayloadField::WorkId => "work_id",
            PayloadField::FileName => "file_name",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchValue {
    pub value: String,
}

/// Exact-value match on one payload field: `{"key": .., "match": {"value": ..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub key: PayloadField,
    #[serde(rename = "match")]
    pub matches: MatchValue,
}

impl Condition {
    pub fn equals(key: PayloadField, value: impl Into<String>) -> Self {
        Self {
            key,
            matches: MatchValue {
                value: value.into(),
            },
        }
    }

    fn holds_for(&self, value: &str) -> bool {
        self.matches.value == value
    }
}

/// Conjunction of required and forbidden conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn must(mut self, key: PayloadField, value: impl Into<String>) -> Self {
        self.must.push(Condition::equals(key, value));
        self
    }

    pub fn must_not(mut self, key: PayloadField, value: impl Into<String>) -> Self {
        self.must_not.push(Condition::equals(key, value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty()
    }

    /// Evaluates the filter against a stored point.
    pub fn matches(&self, point: &DocumentPoint) -> bool {
        self.must.iter().all(|c| c.holds_for(point.field(c.key)))
            && !self.must_not.iter().any(|c| c.holds_for(point.field(c.key)))
    }

    /// Evaluates the conditions a [`Match`] can answer. `work_id` is not
    /// part of a match, so conditions on it are assumed to hold.
    pub fn admits_match(&self, m: &Match) -> bool {
        let value = |key: PayloadField| match key {
            PayloadField::Sender => Some(m.sender.as_str()),
            PayloadField::FileName => Some(m.file_name.as_str()),
            PayloadField::WorkId => None,
        };
        self.must
            .iter()
            .all(|c| value(c.key).map_or(true, |v| c.holds_for(v)))
            && !self
                .must_not
                .iter()
                .any(|c| value(c.key).is_some_and(|v| c.holds_for(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedding::EmbeddingVector;
    use serde_json::json;

    fn point(sender: &str, work: &str) -> DocumentPoint {
        DocumentPoint::new(
            EmbeddingVector::new(vec![1.0], 1).unwrap(),
            sender,
            work,
            "f.txt",
        )
    }

    #[test]
    fn serializes_to_index_shape() {
        let filter = Filter::new()
            .must(PayloadField::WorkId, "W1")
            .must_not(PayloadField::Sender, "A");
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({
                "must": [{"key": "work_id", "match": {"value": "W1"}}],
                "must_not": [{"key": "sender", "match": {"value": "A"}}]
            })
        );
    }

    #[test]
    fn empty_sections_are_omitted() {
        let filter = Filter::new().must(PayloadField::FileName, "x");
        let value = serde_json::to_value(&filter).unwrap();
        assert!(value.get("must_not").is_none());
        assert!(Filter::new().is_empty());
    }

    #[test]
    fn local_evaluation_follows_conditions() {
        let filter = Filter::new()
            .must(PayloadField::WorkId, "W1")
            .must_not(PayloadField::Sender, "A");
        assert!(filter.matches(&point("B", "W1")));
        assert!(!filter.matches(&point("A", "W1")));
        assert!(!filter.matches(&point("B", "W2")));
    }

    #[test]
    fn admits_match_skips_work_id() {
        let filter = Filter::new()
            .must(PayloadField::WorkId, "W1")
            .must_not(PayloadField::Sender, "A");
        let m = |sender: &str| Match {
            id: crate::PointId::from_raw(1),
            file_name: "f".into(),
            sender: sender.into(),
            score: 1.0,
            inserted_at: None,
        };
        assert!(filter.admits_match(&m("B")));
        assert!(!filter.admits_match(&m("A")));
    }
}
