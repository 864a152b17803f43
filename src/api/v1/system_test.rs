//! Integration tests for system endpoints.

use axum::http::StatusCode;

use crate::api::test_helpers::{api_request, json_body, test_app};

#[tokio::test(flavor = "multi_thread")]
async fn root_describes_the_service() {
    let app = test_app().await;

    let response = app.send(api_request("GET", "/", None, None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["name"], "docuflow");
    assert_eq!(body["api"], "/api/v1");
}

#[tokio::test(flavor = "multi_thread")]
async fn health_needs_no_session() {
    let app = test_app().await;

    let response = app
        .send(api_request("GET", "/health", None, None, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test(flavor = "multi_thread")]
async fn docs_are_off_unless_enabled() {
    let app = test_app().await;

    let response = app.send(api_request("GET", "/docs", None, None, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
