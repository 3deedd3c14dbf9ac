mod common;

use axum::http::{Method, StatusCode};

use common::app::spawn_test_app;
use common::http::{assert_json_error, get_json, request, response_json};

#[tokio::test]
async fn it_health_live_and_ready() {
    let app = spawn_test_app().await;

    let live = request(&app.app, Method::GET, "/health/live", None, &[]).await;
    assert_eq!(live.status(), StatusCode::OK);

    let ready = request(&app.app, Method::GET, "/health/ready", None, &[]).await;
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
async fn it_health_reports_monitor_state() {
    let app = spawn_test_app().await;

    let (status, body) = get_json(&app.app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["monitor"]["running"], false);
    assert_eq!(body["monitor"]["alertActive"], false);
    assert!(body["monitor"]["lastError"].is_null());
}

#[tokio::test]
async fn it_unknown_route_is_json_404_with_trace_id() {
    let app = spawn_test_app().await;

    let resp = request(&app.app, Method::GET, "/nope", None, &[]).await;
    let (status, headers, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_error(&body, "NOT_FOUND");

    let header_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .expect("x-request-id header");
    assert_eq!(body["traceId"], header_id);
}

#[tokio::test]
async fn it_echoes_valid_request_id() {
    let app = spawn_test_app().await;

    let resp = request(
        &app.app,
        Method::GET,
        "/health/live",
        None,
        &[("x-request-id", "client-abc_123".to_string())],
    )
    .await;
    assert_eq!(
        resp.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("client-abc_123")
    );

    let resp = request(
        &app.app,
        Method::GET,
        "/health/live",
        None,
        &[("x-request-id", "bad id!".to_string())],
    )
    .await;
    let generated = resp
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .expect("generated id");
    assert_ne!(generated, "bad id!");
    assert!(uuid::Uuid::parse_str(generated).is_ok());
}
