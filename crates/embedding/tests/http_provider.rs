//! HTTP provider behaviour against a throwaway local embedding service.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use embedding::{EmbeddingError, EmbeddingProvider, HttpEmbeddingProvider, EMBEDDING_DIM};
use resilience::RecordingSleeper;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct Recorded {
    hits: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn provider(addr: SocketAddr, sleeper: Arc<RecordingSleeper>) -> HttpEmbeddingProvider {
    HttpEmbeddingProvider::new(
        format!("http://{addr}/embed"),
        EMBEDDING_DIM,
        Duration::from_secs(5),
    )
    .unwrap()
    .with_sleeper(sleeper)
}

fn service_returning(status: StatusCode, body: Value) -> (Router, Recorded) {
    let recorded = Recorded::default();
    let router = Router::new()
        .route(
            "/embed",
            post(
                move |State(rec): State<Recorded>, Json(req): Json<Value>| {
                    let body = body.clone();
                    async move {
                        rec.hits.fetch_add(1, Ordering::SeqCst);
                        rec.bodies.lock().unwrap().push(req);
                        (status, Json(body)).into_response()
                    }
                },
            ),
        )
        .with_state(recorded.clone());
    (router, recorded)
}

#[tokio::test]
async fn returns_vector_of_expected_dimension() {
    let values: Vec<f64> = (0..EMBEDDING_DIM).map(|i| i as f64 / 1000.0).collect();
    let (router, recorded) = service_returning(StatusCode::OK, json!({ "embedding": values }));
    let addr = spawn(router).await;
    let sleeper = Arc::new(RecordingSleeper::default());

    let v = provider(addr, sleeper.clone())
        .embed("some document text")
        .await
        .unwrap();

    assert_eq!(v.len(), EMBEDDING_DIM);
    assert!((v.as_slice()[1] - 0.001).abs() < 1e-6);
    assert_eq!(recorded.hits.load(Ordering::SeqCst), 1);
    assert_eq!(
        recorded.bodies.lock().unwrap()[0],
        json!({ "text": "some document text" })
    );
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn wrong_length_is_dimension_mismatch() {
    let (router, _) = service_returning(StatusCode::OK, json!({ "embedding": vec![0.1; 383] }));
    let addr = spawn(router).await;

    let err = provider(addr, Arc::new(RecordingSleeper::default()))
        .embed("text")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        EmbeddingError::DimensionMismatch {
            expected: 384,
            actual: 383
        }
    );
}

#[tokio::test]
async fn error_status_is_rejected_without_retry() {
    let (router, recorded) = service_returning(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "detail": "model not loaded" }),
    );
    let addr = spawn(router).await;
    let sleeper = Arc::new(RecordingSleeper::default());

    let err = provider(addr, sleeper.clone())
        .embed("text")
        .await
        .unwrap_err();

    match err {
        EmbeddingError::Rejected { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("model not loaded"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert_eq!(recorded.hits.load(Ordering::SeqCst), 1);
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn malformed_body_is_invalid_response() {
    let (router, _) = service_returning(StatusCode::OK, json!({ "vector": [] }));
    let addr = spawn(router).await;

    let err = provider(addr, Arc::new(RecordingSleeper::default()))
        .embed("text")
        .await
        .unwrap_err();

    assert!(matches!(err, EmbeddingError::InvalidResponse(_)));
}

#[tokio::test]
async fn unreachable_service_is_retried_then_unavailable() {
    // Bind and immediately release a port so connections are refused.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let sleeper = Arc::new(RecordingSleeper::default());
    let err = provider(addr, sleeper.clone())
        .embed("text")
        .await
        .unwrap_err();

    assert!(
        matches!(err, EmbeddingError::ProviderUnavailable { attempts: 3, .. }),
        "got {err:?}"
    );
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}
