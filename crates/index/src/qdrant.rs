//! Qdrant REST client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use embedding::EmbeddingVector;
use resilience::{with_retry, RetryError, RetryPolicy, Sleeper, TokioSleeper, Transient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::types::rank_matches;
use crate::{
    CollectionSpec, DocumentPoint, Filter, IndexConfig, IndexError, Match, PointId, SearchQuery,
    VectorIndex,
};

#[derive(Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: String,
}

#[derive(Serialize)]
struct Payload<'a> {
    sender: &'a str,
    work_id: &'a str,
    file_name: &'a str,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct PointBody<'a> {
    id: PointId,
    vector: &'a EmbeddingVector,
    payload: Payload<'a>,
}

#[derive(Serialize)]
struct UpsertBody<'a> {
    points: [PointBody<'a>; 1],
}

#[derive(Serialize)]
struct SearchBody<'a> {
    vector: &'a EmbeddingVector,
    limit: usize,
    with_payload: bool,
    with_vector: bool,
    score_threshold: f32,
    #[serde(skip_serializing_if = "filter_is_empty")]
    filter: &'a Filter,
}

/// Extra hits requested beyond the query limit. Qdrant cuts at `limit`
/// before the local insertion-order tie-break runs; ties wider than this
/// headroom are broken best-effort.
const TIE_HEADROOM: usize = 16;

impl<'a> SearchBody<'a> {
    fn from_query(query: &'a SearchQuery) -> Self {
        Self {
            vector: &query.vector,
            limit: query.limit.saturating_add(TIE_HEADROOM),
            with_payload: true,
            with_vector: false,
            score_threshold: query.score_threshold,
            filter: &query.filter,
        }
    }
}

fn filter_is_empty(filter: &&Filter) -> bool {
    filter.is_empty()
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<StoredPayload>,
}

#[derive(Deserialize)]
struct StoredPayload {
    #[serde(default)]
    sender: String,
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Outcome of one HTTP exchange inside a retry loop.
enum AttemptError {
    Transport(reqwest::Error),
    Status { status: u16, message: String },
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Transport(err) => write!(f, "{err}"),
            AttemptError::Status { status, message } => write!(f, "status {status}: {message}"),
        }
    }
}

impl Transient for AttemptError {
    fn is_transient(&self) -> bool {
        matches!(self, AttemptError::Transport(_))
    }
}

/// Readiness treats any non-success answer as "not up yet".
struct NotReady(String);

impl fmt::Display for NotReady {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Transient for NotReady {
    fn is_transient(&self) -> bool {
        true
    }
}

/// Per-operation request timeouts.
#[derive(Debug, Clone, Copy)]
pub struct QdrantTimeouts {
    pub check: Duration,
    pub create: Duration,
    pub upsert: Duration,
    pub search: Duration,
}

impl Default for QdrantTimeouts {
    fn default() -> Self {
        Self {
            check: Duration::from_secs(5),
            create: Duration::from_secs(10),
            upsert: Duration::from_secs(15),
            search: Duration::from_secs(10),
        }
    }
}

/// [`VectorIndex`] over the Qdrant REST API.
pub struct QdrantIndex {
    client: reqwest::Client,
    base_url: String,
    timeouts: QdrantTimeouts,
    readiness: RetryPolicy,
    upsert_retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl fmt::Debug for QdrantIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QdrantIndex")
            .field("base_url", &self.base_url)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl QdrantIndex {
    pub fn new(base_url: impl Into<String>) -> Result<Self, IndexError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| IndexError::InvalidConfig(format!("http client: {e}")))?;
        let cfg = IndexConfig::default();
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeouts: QdrantTimeouts::default(),
            readiness: cfg.readiness,
            upsert_retry: cfg.upsert_retry,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn from_config(cfg: &IndexConfig) -> Result<Self, IndexError> {
        let url = cfg
            .url
            .as_deref()
            .ok_or_else(|| IndexError::InvalidConfig("url is required for the qdrant backend".into()))?;
        let search = Duration::from_secs(cfg.timeout_secs);
        Ok(Self::new(url)?
            .with_timeouts(QdrantTimeouts {
                check: search,
                create: Duration::from_secs(cfg.create_timeout_secs),
                upsert: Duration::from_secs(cfg.upsert_timeout_secs),
                search,
            })
            .with_readiness(cfg.readiness)
            .with_upsert_retry(cfg.upsert_retry))
    }

    pub fn with_timeouts(mut self, timeouts: QdrantTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_readiness(mut self, policy: RetryPolicy) -> Self {
        self.readiness = policy;
        self
    }

    pub fn with_upsert_retry(mut self, policy: RetryPolicy) -> Self {
        self.upsert_retry = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    fn collection_url(&self, name: &str) -> String {
        format!("{}/collections/{}", self.base_url, name)
    }

    /// Polls `GET /collections` until the service answers with success.
    pub async fn wait_until_ready(&self) -> Result<(), IndexError> {
        let url = format!("{}/collections", self.base_url);
        with_retry(&self.readiness, self.sleeper.as_ref(), |attempt| {
            let request = self.client.get(&url).timeout(self.timeouts.check);
            async move {
                debug!(attempt, "waiting for vector index");
                match request.send().await {
                    Ok(resp) if resp.status().is_success() => Ok(()),
                    Ok(resp) => Err(NotReady(format!("status {}", resp.status().as_u16()))),
                    Err(err) => Err(NotReady(err.to_string())),
                }
            }
        })
        .await
        .map_err(|err| IndexError::Unavailable {
            attempts: err.attempts(),
            message: err.into_inner().0,
        })
    }

    fn check_existing(spec: &CollectionSpec, body: &Value) -> Result<(), IndexError> {
        let params = &body["result"]["config"]["params"]["vectors"];
        let (Some(size), Some(distance)) = (params["size"].as_u64(), params["distance"].as_str())
        else {
            warn!(collection = %spec.name, "collection has no single unnamed vector config, skipping compatibility check");
            return Ok(());
        };
        if size as usize != spec.dimension || !distance.eq_ignore_ascii_case(&spec.distance.to_string()) {
            return Err(IndexError::CollectionMismatch {
                name: spec.name.clone(),
                detail: format!(
                    "expected {} dimensions with {} distance, found {size} with {distance}",
                    spec.dimension, spec.distance
                ),
            });
        }
        Ok(())
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), IndexError> {
        let body = CreateCollection {
            vectors: VectorParams {
                size: spec.dimension,
                distance: spec.distance.to_string(),
            },
        };
        let response = self
            .client
            .put(self.collection_url(&spec.name))
            .timeout(self.timeouts.create)
            .json(&body)
            .send()
            .await
            .map_err(|e| IndexError::Unavailable {
                attempts: 1,
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            info!(collection = %spec.name, dimension = spec.dimension, "created collection");
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        if message.contains("already exists") {
            debug!(collection = %spec.name, "collection created concurrently");
            return Ok(());
        }
        Err(IndexError::Bootstrap {
            status: status.as_u16(),
            message,
        })
    }
}

fn parse_point_id(raw: &Value) -> Option<PointId> {
    match raw {
        Value::Number(n) => n.as_u64().map(PointId::from_raw),
        Value::String(s) => s.parse().ok().map(PointId::from_raw),
        _ => None,
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), IndexError> {
        self.wait_until_ready().await?;

        let response = self
            .client
            .get(self.collection_url(&spec.name))
            .timeout(self.timeouts.check)
            .send()
            .await
            .map_err(|e| IndexError::Unavailable {
                attempts: 1,
                message: e.to_string(),
            })?;

        match response.status().as_u16() {
            200 => {
                let body: Value = response
                    .json()
                    .await
                    .map_err(|e| IndexError::Decode(e.to_string()))?;
                Self::check_existing(spec, &body)?;
                debug!(collection = %spec.name, "collection already present");
                Ok(())
            }
            404 => self.create_collection(spec).await,
            status => Err(IndexError::Bootstrap {
                status,
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn upsert(&self, collection: &str, point: &DocumentPoint) -> Result<PointId, IndexError> {
        let url = format!("{}/points?wait=true", self.collection_url(collection));
        let body = UpsertBody {
            points: [PointBody {
                id: point.id,
                vector: &point.vector,
                payload: Payload {
                    sender: &point.sender,
                    work_id: &point.work_id,
                    file_name: &point.file_name,
                    timestamp: point.inserted_at,
                },
            }],
        };

        with_retry(&self.upsert_retry, self.sleeper.as_ref(), |attempt| {
            let request = self
                .client
                .put(&url)
                .timeout(self.timeouts.upsert)
                .json(&body);
            async move {
                debug!(attempt, "upserting point");
                let response = request.send().await.map_err(AttemptError::Transport)?;
                let status = response.status();
                if status.is_success() {
                    return Ok(());
                }
                Err(AttemptError::Status {
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                })
            }
        })
        .await
        .map_err(|err: RetryError<AttemptError>| {
            let attempts = err.attempts();
            match err.into_inner() {
                AttemptError::Transport(e) => IndexError::Unavailable {
                    attempts,
                    message: e.to_string(),
                },
                AttemptError::Status { status, message } => {
                    IndexError::UpsertRejected { status, message }
                }
            }
        })?;

        debug!(id = %point.id, collection, "point upserted");
        Ok(point.id)
    }

    async fn search(&self, collection: &str, query: &SearchQuery) -> Result<Vec<Match>, IndexError> {
        let body = SearchBody::from_query(query);

        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url(collection)))
            .timeout(self.timeouts.search)
            .json(&body)
            .send()
            .await
            .map_err(|e| IndexError::SearchFailed {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IndexError::SearchFailed {
                status: Some(status.as_u16()),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| IndexError::Decode(e.to_string()))?;

        let matches = parsed
            .result
            .into_iter()
            .filter_map(|hit| {
                let id = parse_point_id(&hit.id)?;
                let payload = hit.payload?;
                Some(Match {
                    id,
                    file_name: payload.file_name,
                    sender: payload.sender,
                    score: hit.score,
                    inserted_at: payload
                        .timestamp
                        .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
                        .map(|ts| ts.with_timezone(&Utc)),
                })
            })
            .collect();

        Ok(rank_matches(matches, query))
    }

    fn name(&self) -> &'static str {
        "qdrant"
    }
}
