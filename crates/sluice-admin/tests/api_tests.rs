//! Integration tests for the admin API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server, against the in-memory store with time pinned
//! by a manual clock.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::{Value, json};
use sluice_admin::router::build_router;
use sluice_admin::state::AppState;
use sluice_core::{ManualClock, RelayPolicy, SluiceConfig};
use sluice_db::{EventStore, MemoryEventStore, StoreBackend};
use sluice_types::{Category, Event, Identity};
use tower::ServiceExt;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

fn make_test_state(retention_count: u32) -> Arc<AppState> {
    let mut config = SluiceConfig::default();
    config.retention.retention_count = retention_count;
    let store = Arc::new(StoreBackend::Memory(MemoryEventStore::new()));
    let policy = RelayPolicy::from_config(&config, store, Arc::new(ManualClock::new(now())));
    Arc::new(AppState::new(Arc::new(policy)))
}

async fn seed(state: &AppState, identity: &str, n: i64, at: DateTime<Utc>) {
    for i in 0..n {
        let event = Event::new(format!("{identity}-{i}"), identity, 1, at + TimeDelta::seconds(i));
        state.policy.store().persist(&event).await.unwrap();
    }
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// =============================================================================
// Status
// =============================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let router = build_router(make_test_state(100));

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("BasicRelay"));
    assert!(html.contains("10000"));
}

#[tokio::test]
async fn test_index_escapes_relay_name() {
    let mut config = SluiceConfig::default();
    config.relay.name = String::from("<script>alert(1)</script>");
    let store = Arc::new(StoreBackend::Memory(MemoryEventStore::new()));
    let policy = RelayPolicy::from_config(&config, store, Arc::new(ManualClock::new(now())));
    let router = build_router(Arc::new(AppState::new(Arc::new(policy))));

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
}

#[tokio::test]
async fn test_status_reports_limits_and_stats() {
    let router = build_router(make_test_state(100));

    let response = router
        .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["relay"], "BasicRelay");
    assert_eq!(json["backend"], "memory");
    assert_eq!(json["limits"]["max_event_bytes"], 10_000);
    assert_eq!(json["limits"]["retention_count"], 100);
    assert_eq!(json["limits"]["retention_age_months"], 3);
    assert_eq!(json["limits"]["purge_interval_secs"], 3600);
    assert_eq!(json["stats"]["purges_run"], 0);
    assert!(json["stats"]["last_purge_at"].is_null());
}

// =============================================================================
// Retention
// =============================================================================

#[tokio::test]
async fn test_purge_removes_expired_events() {
    let state = make_test_state(100);
    seed(&state, "old", 3, now() - TimeDelta::days(120)).await;
    seed(&state, "new", 2, now() - TimeDelta::days(10)).await;
    let router = build_router(Arc::clone(&state));

    let response = router
        .oneshot(Request::post("/api/retention/purge").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["deleted"], 3);
    assert_eq!(json["cutoff"], "2024-03-01T00:00:00Z");
    assert_eq!(state.policy.stats().snapshot().events_purged, 3);
}

#[tokio::test]
async fn test_trim_keeps_newest() {
    let state = make_test_state(2);
    seed(&state, "u1", 5, now()).await;
    let router = build_router(Arc::clone(&state));

    let response = router
        .oneshot(post_json(
            "/api/retention/trim",
            &json!({ "identity": "u1", "category": 1 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["outcome"], "trimmed");
    assert_eq!(json["deleted"], 3);
    assert_eq!(json["identity"], "u1");
    assert_eq!(json["category"], 1);
}

#[tokio::test]
async fn test_trim_small_pair_is_skipped() {
    let state = make_test_state(10);
    seed(&state, "u1", 3, now()).await;
    let router = build_router(state);

    let response = router
        .oneshot(post_json(
            "/api/retention/trim",
            &json!({ "identity": "u1", "category": 1 }),
        ))
        .await
        .unwrap();

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["outcome"], "skipped");
    assert_eq!(json["deleted"], 0);
}

#[tokio::test]
async fn test_trim_with_malformed_body_is_bad_request() {
    let router = build_router(make_test_state(100));

    let response = router
        .oneshot(post_json("/api/retention/trim", &json!({ "identity": "u1" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 400);
}

// =============================================================================
// Inspection
// =============================================================================

#[tokio::test]
async fn test_pair_count() {
    let state = make_test_state(100);
    seed(&state, "u1", 4, now()).await;
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::get("/api/identities/u1/categories/1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 4);
    assert_eq!(json["retention_count"], 100);
}

#[tokio::test]
async fn test_pair_count_rejects_bad_category() {
    let router = build_router(make_test_state(100));

    let response = router
        .oneshot(
            Request::get("/api/identities/u1/categories/not-a-kind")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("not-a-kind"));
}

// =============================================================================
// Admission
// =============================================================================

#[tokio::test]
async fn test_admission_check_accepts_small_event() {
    let state = make_test_state(100);
    let router = build_router(Arc::clone(&state));
    let event = serde_json::to_value(Event::new("e1", "u1", 1, now()).with_content("hi")).unwrap();

    let response = router
        .oneshot(post_json("/api/admission/check", &event))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["accepted"], true);
    assert!(json["size"].as_u64().unwrap() < 10_000);
    // Dry runs never store or count.
    let stored = state
        .policy
        .store()
        .count_for(&Identity::from("u1"), Category(1))
        .await
        .unwrap();
    assert_eq!(stored, 0);
    assert_eq!(state.policy.stats().snapshot().accepted, 0);
}

#[tokio::test]
async fn test_admission_check_rejects_oversized_event() {
    let router = build_router(make_test_state(100));
    let big = Event::new("e1", "u1", 1, now()).with_content("x".repeat(10_000));
    let event = serde_json::to_value(big).unwrap();

    let response = router
        .oneshot(post_json("/api/admission/check", &event))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["accepted"], false);
    assert!(json["reason"].as_str().unwrap().starts_with("blocked:"));
}

#[tokio::test]
async fn test_admission_check_rejects_garbage() {
    let router = build_router(make_test_state(100));

    let response = router
        .oneshot(
            Request::post("/api/admission/check")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let router = build_router(make_test_state(100));

    let response = router
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
