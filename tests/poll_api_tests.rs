//! Integration tests for the chimed HTTP API
//!
//! Drives the real router end to end: the poll protocol (version
//! parameter, cookie fallback, cookie write-back, mute), the
//! administrative trigger/cancel endpoints, the shared-secret gate, and
//! queue inspection.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

use chimed::api::{build_router, AppContext};
use chimed::config::Config;
use chimed::SharedState;

/// Test helper: Build an app whose queue starts at version 10, matching
/// the protocol examples.
fn setup_app(config: Config) -> axum::Router {
    let state = Arc::new(SharedState::new(config));
    build_router(AppContext { state })
}

fn test_config() -> Config {
    Config {
        base_version: 10,
        ..Config::default()
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Test helper: Queue a sound through the trigger endpoint
async fn trigger(app: &axum::Router, url: &str, delay_ms: Option<i64>) {
    let mut body = json!({ "url": url });
    if let Some(d) = delay_ms {
        body["delay_ms"] = json!(d);
    }
    let response = app
        .clone()
        .oneshot(post_json("/sounds/trigger", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Health Endpoint
// =============================================================================

#[tokio::test]
async fn health_endpoint_requires_no_auth() {
    let app = setup_app(test_config());

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["module"], "chimed");
    assert!(body["version"].is_string());
}

// =============================================================================
// Poll Protocol
// =============================================================================

#[tokio::test]
async fn first_contact_baselines_without_replaying_history() {
    let app = setup_app(test_config());
    trigger(&app, "sound1", Some(0)).await;
    trigger(&app, "sound2", Some(0)).await;

    let response = app.clone().oneshot(get("/sounds/poll")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Should set version cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("CHIMED_VERSION=12"));

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["v"], 12);
    assert!(body.get("play").is_none());
    assert_eq!(body["d"], 0);
    assert!(body.get("x").is_none());
}

#[tokio::test]
async fn version_parameter_returns_next_unplayed_sound() {
    let app = setup_app(test_config());
    trigger(&app, "sound1", Some(0)).await;
    trigger(&app, "sound2", Some(0)).await;

    let response = app
        .clone()
        .oneshot(get("/sounds/poll?version=10"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["v"], 11);
    assert_eq!(body["play"], "sound1");
    assert_eq!(body["d"], 0);
}

#[tokio::test]
async fn version_cookie_is_used_when_parameter_is_absent() {
    let app = setup_app(test_config());
    trigger(&app, "sound1", Some(0)).await;
    trigger(&app, "sound2", Some(0)).await;

    let response = app
        .clone()
        .oneshot(get_with_cookie("/sounds/poll", "CHIMED_VERSION=10"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["v"], 11);
    assert_eq!(body["play"], "sound1");
}

#[tokio::test]
async fn version_parameter_takes_precedence_over_cookie() {
    let app = setup_app(test_config());
    trigger(&app, "sound1", Some(0)).await;
    trigger(&app, "sound2", Some(0)).await;

    let response = app
        .clone()
        .oneshot(get_with_cookie(
            "/sounds/poll?version=11",
            "CHIMED_VERSION=10",
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["v"], 12);
    assert_eq!(body["play"], "sound2");
}

#[tokio::test]
async fn caught_up_poller_sees_no_change() {
    let app = setup_app(test_config());
    trigger(&app, "sound1", Some(0)).await;
    trigger(&app, "sound2", Some(0)).await;

    let response = app
        .clone()
        .oneshot(get("/sounds/poll?version=12"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["v"], 12);
    assert!(body.get("play").is_none());
    assert_eq!(body["d"], 0);
}

#[tokio::test]
async fn default_delay_is_reported_for_fresh_sounds() {
    let app = setup_app(test_config());
    trigger(&app, "sound1", None).await;

    let response = app
        .clone()
        .oneshot(get("/sounds/poll?version=10"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["v"], 11);
    assert_eq!(body["play"], "sound1");
    let d = body["d"].as_u64().unwrap();
    assert!(d > 0 && d <= 2_200, "d={}", d);
}

#[tokio::test]
async fn negative_requested_delay_is_clamped() {
    let app = setup_app(test_config());
    trigger(&app, "sound1", Some(-500)).await;

    let response = app
        .clone()
        .oneshot(get("/sounds/poll?version=10"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["play"], "sound1");
    assert_eq!(body["d"], 0);
}

// =============================================================================
// Mute Handling
// =============================================================================

#[tokio::test]
async fn muted_poller_gets_sentinel_and_long_interval() {
    let app = setup_app(test_config());
    trigger(&app, "sound1", Some(0)).await;
    trigger(&app, "sound2", Some(0)).await;

    let response = app
        .clone()
        .oneshot(get_with_cookie("/sounds/poll?version=10", "CHIMED_MUTE=muted"))
        .await
        .unwrap();

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Should set version cookie even when muted")
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("CHIMED_VERSION=-1"));

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["v"], -1);
    assert!(body.get("play").is_none());
    assert_eq!(body["d"], 60_000);
}

#[tokio::test]
async fn stored_mute_sentinel_rebaselines_after_unmute() {
    let app = setup_app(test_config());
    trigger(&app, "sound1", Some(0)).await;

    // Mute cookie gone, but the stored version cookie still holds -1:
    // treated as first contact, not as a real cursor.
    let response = app
        .clone()
        .oneshot(get_with_cookie("/sounds/poll", "CHIMED_VERSION=-1"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["v"], 11);
    assert!(body.get("play").is_none());
}

// =============================================================================
// Cancel
// =============================================================================

#[tokio::test]
async fn cancel_clears_queue_and_flags_the_jump() {
    let app = setup_app(test_config());
    trigger(&app, "sound1", Some(0)).await;
    trigger(&app, "sound2", Some(0)).await;

    let response = app.clone().oneshot(post_empty("/sounds/cancel")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/sounds/poll?version=10"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["v"], 13);
    assert!(body.get("play").is_none());
    assert_eq!(body["x"], true);
}

// =============================================================================
// Trigger
// =============================================================================

#[tokio::test]
async fn trigger_reports_the_assigned_version() {
    let app = setup_app(test_config());

    let response = app
        .clone()
        .oneshot(post_json("/sounds/trigger", &json!({ "url": "sound1" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], 11);
}

// =============================================================================
// Queue Inspection
// =============================================================================

#[tokio::test]
async fn queue_listing_reports_surviving_sounds() {
    let app = setup_app(test_config());
    trigger(&app, "sound1", Some(0)).await;
    trigger(&app, "sound2", None).await;

    let response = app.clone().oneshot(get("/sounds/queue")).await.unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["version"], 12);
    let sounds = body["sounds"].as_array().unwrap();
    assert_eq!(sounds.len(), 2);
    assert_eq!(sounds[0]["version"], 11);
    assert_eq!(sounds[0]["url"], "sound1");
    assert_eq!(sounds[0]["expired"], false);
    assert_eq!(sounds[1]["version"], 12);
}

// =============================================================================
// Shared-Secret Gate
// =============================================================================

#[tokio::test]
async fn trigger_without_secret_is_unauthorized() {
    let app = setup_app(Config {
        shared_secret: 42,
        ..test_config()
    });

    let response = app
        .clone()
        .oneshot(post_json("/sounds/trigger", &json!({ "url": "sound1" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("Missing"));
}

#[tokio::test]
async fn trigger_with_wrong_secret_is_unauthorized() {
    let app = setup_app(Config {
        shared_secret: 42,
        ..test_config()
    });

    let request = Request::builder()
        .method("POST")
        .uri("/sounds/trigger")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-shared-secret", "41")
        .body(Body::from(json!({ "url": "sound1" }).to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn trigger_with_correct_secret_succeeds() {
    let app = setup_app(Config {
        shared_secret: 42,
        ..test_config()
    });

    let request = Request::builder()
        .method("POST")
        .uri("/sounds/trigger")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-shared-secret", "42")
        .body(Body::from(json!({ "url": "sound1" }).to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["version"], 11);
}

#[tokio::test]
async fn poll_stays_public_when_a_secret_is_set() {
    let app = setup_app(Config {
        shared_secret: 42,
        ..test_config()
    });

    let response = app.clone().oneshot(get("/sounds/poll")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
