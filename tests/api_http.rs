// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

mod common;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use common::{engine_with, raw, Step};
use reddit_live_stats::{api, AppState};

const BODY_LIMIT: usize = 1024 * 1024;

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

fn seeded_steps() -> Vec<Step> {
    vec![Step::Items(vec![
        raw("1", "u1", 10),
        raw("2", "u1", 20),
        raw("3", "u2", 30),
    ])]
}

#[tokio::test]
async fn health_returns_ok() {
    let (engine, _, _) = engine_with(Vec::new());
    let app = api::router(AppState::new(engine, true));

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "OK");
}

#[tokio::test]
async fn top_posts_refreshes_then_ranks() {
    let (engine, _, provider) = engine_with(seeded_steps());
    let app = api::router(AppState::new(engine, true));

    let (status, body) = get(app, "/stats/top-posts?count=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(provider.calls(), 1, "query should force one fetch");

    let v: Json = serde_json::from_slice(&body).expect("json");
    let arr = v.as_array().expect("array");
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["id"], "3");
    assert_eq!(arr[0]["score"], 30);
    assert_eq!(arr[1]["id"], "2");
    assert!(arr[0].get("ingested_at").is_some());
}

#[tokio::test]
async fn top_users_returns_rollups() {
    let (engine, _, _) = engine_with(seeded_steps());
    let app = api::router(AppState::new(engine, true));

    let (status, body) = get(app, "/stats/top-users?count=5").await;
    assert_eq!(status, StatusCode::OK);

    let v: Json = serde_json::from_slice(&body).expect("json");
    let arr = v.as_array().expect("array");
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["author"], "u1");
    assert_eq!(arr[0]["post_count"], 2);
    assert_eq!(arr[0]["total_score"], 30);
    assert_eq!(arr[1]["author"], "u2");
}

#[tokio::test]
async fn negative_count_yields_empty_array() {
    let (engine, _, _) = engine_with(seeded_steps());
    let app = api::router(AppState::new(engine, true));

    let (status, body) = get(app, "/stats/top-posts?count=-3").await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&body).expect("json");
    assert_eq!(v, serde_json::json!([]));
}

#[tokio::test]
async fn refresh_failure_still_serves_stored_data() {
    let (engine, store, provider) = engine_with(vec![Step::Fail("reddit down")]);
    store.merge(vec![raw("old", "u9", 5)]);
    let app = api::router(AppState::new(engine, true));

    let (status, body) = get(app, "/stats/top-posts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(provider.calls(), 1);

    let v: Json = serde_json::from_slice(&body).expect("json");
    assert_eq!(v.as_array().unwrap().len(), 1);
    assert_eq!(v[0]["id"], "old");
}

#[tokio::test]
async fn fetch_and_process_reports_outcome_in_body() {
    let (engine, _, _) = engine_with(vec![Step::Items(vec![raw("1", "u1", 1)]), Step::Fail("boom")]);
    let app = api::router(AppState::new(engine, true));

    let (status, body) = get(app.clone(), "/stats/fetch-and-process").await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&body).expect("json");
    assert_eq!(v["fetched"], true);

    let (status, body) = get(app, "/stats/fetch-and-process").await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&body).expect("json");
    assert_eq!(v["fetched"], false);
    assert!(v["message"].as_str().unwrap().contains("boom"));
}

#[tokio::test]
async fn refresh_can_be_disabled() {
    let (engine, store, provider) = engine_with(seeded_steps());
    store.merge(vec![raw("x", "u1", 1)]);
    let app = api::router(AppState::new(engine, false));

    let (status, body) = get(app, "/stats/top-users").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(provider.calls(), 0);

    let v: Json = serde_json::from_slice(&body).expect("json");
    assert_eq!(v.as_array().unwrap().len(), 1);
}
