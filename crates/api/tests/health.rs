//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, body_string, get};

#[tokio::test]
async fn health_check_returns_json() {
    let data = tempfile::tempdir().unwrap();
    let app = common::build_test_app(common::test_state(data.path()));
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["version"].is_string());
    assert_eq!(json["detector"], "stub");
    let ffmpeg = json["ffmpeg_available"].as_bool().unwrap();
    assert_eq!(json["status"], if ffmpeg { "ok" } else { "degraded" });
}

#[tokio::test]
async fn index_serves_upload_form() {
    let data = tempfile::tempdir().unwrap();
    let app = common::build_test_app(common::test_state(data.path()));
    let response = get(app, "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));

    let page = body_string(response).await;
    assert!(page.contains(r#"enctype="multipart/form-data""#));
    assert!(page.contains(r#"name="video""#));
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let data = tempfile::tempdir().unwrap();
    let app = common::build_test_app(common::test_state(data.path()));
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let data = tempfile::tempdir().unwrap();
    let app = common::build_test_app(common::test_state(data.path()));
    let response = get(app, "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let data = tempfile::tempdir().unwrap();
    let app = common::build_test_app(common::test_state(data.path()));

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/upload")
        .header("Origin", "http://localhost:5000")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .body(Body::empty())
        .unwrap();
    let response = common::send(app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:5000"
    );
}
