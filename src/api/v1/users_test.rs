//! Integration tests for profiles and mention autocomplete.

use axum::http::StatusCode;
use serde_json::json;

use crate::api::test_helpers::{api_request, json_body, test_app};

#[tokio::test(flavor = "multi_thread")]
async fn patch_me_updates_profile() {
    let app = test_app().await;
    let (token, _) = app.register("ada@example.com", "Ada").await;

    let response = app
        .send(api_request(
            "PATCH",
            "/api/v1/users/me",
            Some(&token),
            None,
            Some(json!({"name": "Ada King", "avatar_url": "https://example.com/ada.png"})),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], "Ada King");
    assert_eq!(body["avatar_url"], "https://example.com/ada.png");

    // Explicit null clears, absent leaves alone
    let response = app
        .send(api_request(
            "PATCH",
            "/api/v1/users/me",
            Some(&token),
            None,
            Some(json!({"avatar_url": null})),
        ))
        .await;
    let body = json_body(response).await;
    assert_eq!(body["name"], "Ada King");
    assert!(body["avatar_url"].is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn patch_me_rejects_blank_name() {
    let app = test_app().await;
    let (token, _) = app.register("ada@example.com", "Ada").await;

    let response = app
        .send(api_request(
            "PATCH",
            "/api/v1/users/me",
            Some(&token),
            None,
            Some(json!({"name": ""})),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn search_only_returns_team_members() {
    let app = test_app().await;
    let (owner, _, team_id) = app.owner_with_team().await;
    app.register("adam@example.com", "Adam").await;
    app.register("adele@example.com", "Adele").await;
    app.add_member(&owner, &team_id, "adele@example.com", "member")
        .await;

    let response = app
        .call("GET", "/api/v1/users/search?q=ad", &owner, &team_id, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let users = json_body(response).await;
    let names: Vec<&str> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Adele"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn team_routes_require_the_team_header() {
    let app = test_app().await;
    let (owner, _, _) = app.owner_with_team().await;

    let response = app
        .send(api_request(
            "GET",
            "/api/v1/users/search?q=a",
            Some(&owner),
            None,
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Missing X-Team-Id header"
    );
}
