//! Integration tests for the HTTP surface.
//!
//! Tests drive the Axum `Router` directly via `tower::ServiceExt` without
//! starting a TCP server.

use std::fs;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use futures::future::join_all;
use railcache::cache::SnapshotStore;
use railcache::server::build_router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn router_with(store: Arc<SnapshotStore>) -> (Router, TempDir) {
    let public = TempDir::new().expect("Failed to create temp directory");
    (build_router(store, public.path()), public)
}

async fn get(router: Router, path: &str) -> axum::response::Response {
    router
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_timetables_before_first_refresh_is_503() {
    let (router, _public) = router_with(Arc::new(SnapshotStore::new()));

    let response = get(router, "/api/timetables").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body, json!({"error": "Data not available yet"}));
}

#[tokio::test]
async fn test_timetables_serves_snapshot_with_timestamp() {
    let store = Arc::new(SnapshotStore::new());
    let captured_at = Utc.with_ymd_and_hms(2024, 7, 15, 5, 30, 0).unwrap();
    store.replace(
        json!({"data": {"vehiclePositions": [{"vehicleId": "mav-1", "lat": 47.5, "lon": 19.04}]}}),
        captured_at,
    );
    let (router, _public) = router_with(store);

    let response = get(router, "/api/timetables").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["timestamp"], "2024-07-15T05:30:00.000Z");
    assert_eq!(body["data"]["data"]["vehiclePositions"][0]["vehicleId"], "mav-1");
}

#[tokio::test]
async fn test_timetables_reflects_latest_replace() {
    let store = Arc::new(SnapshotStore::new());
    let (router, _public) = router_with(Arc::clone(&store));

    store.replace(json!({"seq": 1}), Utc::now());
    let first = body_to_json(get(router.clone(), "/api/timetables").await.into_body()).await;
    store.replace(json!({"seq": 2}), Utc::now());
    let second = body_to_json(get(router, "/api/timetables").await.into_body()).await;

    assert_eq!(first["data"], json!({"seq": 1}));
    assert_eq!(second["data"], json!({"seq": 2}));
}

#[tokio::test]
async fn test_concurrent_requests_all_see_a_whole_snapshot() {
    let store = Arc::new(SnapshotStore::new());
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    store.replace(json!({"seq": 0}), base);
    let (router, _public) = router_with(Arc::clone(&store));

    let writer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for i in 1..200i64 {
                store.replace(json!({ "seq": i }), base + chrono::Duration::seconds(i));
                tokio::task::yield_now().await;
            }
        })
    };

    let requests = (0..50).map(|_| {
        let router = router.clone();
        async move { body_to_json(get(router, "/api/timetables").await.into_body()).await }
    });
    let bodies = join_all(requests).await;
    writer.await.unwrap();

    for body in bodies {
        let seq = body["data"]["seq"].as_i64().unwrap();
        let ts: chrono::DateTime<Utc> = body["timestamp"].as_str().unwrap().parse().unwrap();
        assert_eq!((ts - base).num_seconds(), seq, "timestamp and data from different refreshes");
    }
}

#[tokio::test]
async fn test_other_paths_are_served_from_public_dir() {
    let store = Arc::new(SnapshotStore::new());
    let public = TempDir::new().expect("Failed to create temp directory");
    fs::write(public.path().join("index.html"), "<h1>Trains</h1>").unwrap();
    let router = build_router(store, public.path());

    let response = get(router.clone(), "/index.html").await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<h1>Trains</h1>");

    let missing = get(router, "/nope.js").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_timetables_rejects_post() {
    let (router, _public) = router_with(Arc::new(SnapshotStore::new()));

    let response = router
        .oneshot(
            Request::post("/api/timetables")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
