use async_trait::async_trait;
use embedding::cosine_similarity;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::{
    CollectionSpec, Distance, DocumentPoint, IndexError, Match, PointId, SearchQuery, VectorIndex,
};

struct StoredPoint {
    point: DocumentPoint,
    seq: u64,
}

struct Collection {
    spec: CollectionSpec,
    points: HashMap<PointId, StoredPoint>,
    next_seq: u64,
}

/// In-process [`VectorIndex`] using a `RwLock` around per-collection maps.
///
/// Scores every point on each search, so it suits tests and small
/// single-process deployments. Overwriting a point gives it a fresh
/// insertion sequence, which is what ties are broken on.
#[derive(Default)]
pub struct InMemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points in `collection`, 0 when it does not exist.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|guard| guard.get(collection).map_or(0, |c| c.points.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

fn score(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
    match distance {
        Distance::Cosine => cosine_similarity(a, b),
        Distance::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), IndexError> {
        let mut guard = self
            .collections
            .write()
            .map_err(|_| IndexError::InvalidConfig("poisoned lock".into()))?;
        if let Some(existing) = guard.get(&spec.name) {
            if existing.spec != *spec {
                return Err(IndexError::CollectionMismatch {
                    name: spec.name.clone(),
                    detail: format!(
                        "expected {} dimensions with {} distance, found {} with {}",
                        spec.dimension,
                        spec.distance,
                        existing.spec.dimension,
                        existing.spec.distance
                    ),
                });
            }
            return Ok(());
        }
        guard.insert(
            spec.name.clone(),
            Collection {
                spec: spec.clone(),
                points: HashMap::new(),
                next_seq: 0,
            },
        );
        Ok(())
    }

    async fn upsert(&self, collection: &str, point: &DocumentPoint) -> Result<PointId, IndexError> {
        let mut guard = self
            .collections
            .write()
            .map_err(|_| IndexError::InvalidConfig("poisoned lock".into()))?;
        let target = guard
            .get_mut(collection)
            .ok_or_else(|| IndexError::UpsertRejected {
                status: 404,
                message: format!("collection `{collection}` not found"),
            })?;
        if point.vector.len() != target.spec.dimension {
            return Err(IndexError::UpsertRejected {
                status: 400,
                message: format!(
                    "wrong vector dimension: expected {}, got {}",
                    target.spec.dimension,
                    point.vector.len()
                ),
            });
        }
        let seq = target.next_seq;
        target.next_seq += 1;
        target.points.insert(
            point.id,
            StoredPoint {
                point: point.clone(),
                seq,
            },
        );
        Ok(point.id)
    }

    async fn search(&self, collection: &str, query: &SearchQuery) -> Result<Vec<Match>, IndexError> {
        let guard = self
            .collections
            .read()
            .map_err(|_| IndexError::InvalidConfig("poisoned lock".into()))?;
        let target = guard.get(collection).ok_or_else(|| IndexError::SearchFailed {
            status: Some(404),
            message: format!("collection `{collection}` not found"),
        })?;
        if query.vector.len() != target.spec.dimension {
            return Err(IndexError::SearchFailed {
                status: Some(400),
                message: format!(
                    "wrong vector dimension: expected {}, got {}",
                    target.spec.dimension,
                    query.vector.len()
                ),
            });
        }

        let mut scored: Vec<(f32, u64, &DocumentPoint)> = target
            .points
            .values()
            .filter(|stored| query.filter.matches(&stored.point))
            .map(|stored| {
                let s = score(
                    target.spec.distance,
                    query.vector.as_slice(),
                    stored.point.vector.as_slice(),
                );
                (s, stored.seq, &stored.point)
            })
            .filter(|(s, _, _)| *s >= query.score_threshold)
            .collect();

        scored.sort_by(|a, b| match b.0.total_cmp(&a.0) {
            Ordering::Equal => a.1.cmp(&b.1),
            other => other,
        });
        scored.truncate(query.limit);

        Ok(scored
            .into_iter()
            .map(|(score, _, point)| Match {
                id: point.id,
                file_name: point.file_name.clone(),
                sender: point.sender.clone(),
                score,
                inserted_at: Some(point.inserted_at),
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedding::{EmbeddingProvider, EmbeddingVector, HashEmbeddingProvider};

    const COLLECTION: &str = "documents";

    fn v(values: &[f32]) -> EmbeddingVector {
        EmbeddingVector::new(values.to_vec(), values.len()).unwrap()
    }

    async fn index_with(dim: usize) -> InMemoryIndex {
        let index = InMemoryIndex::new();
        index
            .ensure_collection(&CollectionSpec::cosine(COLLECTION, dim))
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn ensure_collection_is_idempotent() {
        let index = index_with(2).await;
        index
            .ensure_collection(&CollectionSpec::cosine(COLLECTION, 2))
            .await
            .unwrap();
        let err = index
            .ensure_collection(&CollectionSpec::cosine(COLLECTION, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::CollectionMismatch { .. }));
    }

    #[tokio::test]
    async fn upsert_same_triple_overwrites() {
        let index = index_with(2).await;
        let a = index
            .upsert(COLLECTION, &DocumentPoint::new(v(&[1.0, 0.0]), "A", "W1", "f"))
            .await
            .unwrap();
        let b = index
            .upsert(COLLECTION, &DocumentPoint::new(v(&[0.0, 1.0]), "A", "W1", "f"))
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(index.len(COLLECTION), 1);
    }

    #[tokio::test]
    async fn upsert_into_missing_collection_is_rejected() {
        let index = InMemoryIndex::new();
        let err = index
            .upsert("nope", &DocumentPoint::new(v(&[1.0]), "A", "W1", "f"))
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::UpsertRejected { status: 404, .. }));
    }

    #[tokio::test]
    async fn search_filters_work_and_sender() {
        let index = index_with(2).await;
        for (sender, work) in [("A", "W1"), ("B", "W1"), ("C", "W2")] {
            index
                .upsert(COLLECTION, &DocumentPoint::new(v(&[1.0, 0.0]), sender, work, "f"))
                .await
                .unwrap();
        }
        let hits = index
            .search(
                COLLECTION,
                &SearchQuery::neighbors(v(&[1.0, 0.0]), "W1", "A", 5, 0.7),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].sender, "B");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn search_respects_threshold_and_limit() {
        let index = index_with(2).await;
        let vectors = [[1.0, 0.0], [0.9, 0.1], [0.8, 0.6], [0.0, 1.0]];
        for (i, values) in vectors.iter().enumerate() {
            index
                .upsert(
                    COLLECTION,
                    &DocumentPoint::new(v(values), format!("S{i}"), "W1", "f"),
                )
                .await
                .unwrap();
        }
        let hits = index
            .search(
                COLLECTION,
                &SearchQuery::neighbors(v(&[1.0, 0.0]), "W1", "nobody", 2, 0.7),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|m| m.score >= 0.7));
        assert_eq!(hits[0].sender, "S0");
        assert_eq!(hits[1].sender, "S1");
    }

    #[tokio::test]
    async fn equal_scores_keep_insertion_order() {
        let index = index_with(2).await;
        for sender in ["first", "second", "third"] {
            index
                .upsert(COLLECTION, &DocumentPoint::new(v(&[1.0, 0.0]), sender, "W1", "f"))
                .await
                .unwrap();
        }
        let hits = index
            .search(
                COLLECTION,
                &SearchQuery::neighbors(v(&[1.0, 0.0]), "W1", "nobody", 5, 0.0),
            )
            .await
            .unwrap();
        let senders: Vec<_> = hits.iter().map(|m| m.sender.as_str()).collect();
        assert_eq!(senders, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn empty_collection_returns_no_matches() {
        let index = index_with(384).await;
        let query = HashEmbeddingProvider::new(384).embed("alpha").await.unwrap();
        let hits = index
            .search(COLLECTION, &SearchQuery::neighbors(query, "W1", "A", 5, 0.7))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
