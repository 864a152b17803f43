//! Integration tests for wiki documents.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};

use crate::api::test_helpers::{TestApp, json_body, test_app};

async fn create_doc(app: &TestApp, token: &str, team: &str, body: Value) -> Value {
    let response = app
        .call("POST", "/api/v1/documents", token, team, Some(body))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

fn id_of(doc: &Value) -> String {
    doc["id"].as_str().unwrap().to_string()
}

#[tokio::test(flavor = "multi_thread")]
async fn create_document_starts_at_version_one() {
    let app = test_app().await;
    let (token, user_id, team) = app.owner_with_team().await;

    let doc = create_doc(
        &app,
        &token,
        &team,
        json!({"title": "Onboarding", "content": "Hello", "icon": "📘"}),
    )
    .await;
    assert_eq!(doc["version"], 1);
    assert_eq!(doc["created_by"], user_id.as_str());
    assert_eq!(doc["icon"], "📘");
    assert!(doc["parent_id"].is_null());

    let response = app
        .call(
            "GET",
            &format!("/api/v1/documents/{}", id_of(&doc)),
            &token,
            &team,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["content"], "Hello");
}

#[tokio::test(flavor = "multi_thread")]
async fn create_document_checks_references() {
    let app = test_app().await;
    let (token, _, team) = app.owner_with_team().await;

    let response = app
        .call(
            "POST",
            "/api/v1/documents",
            &token,
            &team,
            Some(json!({"title": "Orphan", "parent_id": "deadbeef"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .call(
            "POST",
            "/api/v1/documents",
            &token,
            &team,
            Some(json!({"title": "Lost", "project_id": "deadbeef"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .call(
            "POST",
            "/api/v1/documents",
            &token,
            &team,
            Some(json!({"title": ""})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn autosave_bumps_version_and_honours_expected_version() {
    let app = test_app().await;
    let (token, _, team) = app.owner_with_team().await;
    let doc = create_doc(&app, &token, &team, json!({"title": "Notes"})).await;
    let uri = format!("/api/v1/documents/{}", id_of(&doc));

    let response = app
        .call(
            "PATCH",
            &uri,
            &token,
            &team,
            Some(json!({"content": "first draft"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let saved = json_body(response).await;
    assert_eq!(saved["version"], 2);
    assert_eq!(saved["title"], "Notes");

    let response = app
        .call(
            "PATCH",
            &uri,
            &token,
            &team,
            Some(json!({"content": "stale", "expected_version": 1})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .call(
            "PATCH",
            &uri,
            &token,
            &team,
            Some(json!({"content": "second draft", "expected_version": 2})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let saved = json_body(response).await;
    assert_eq!(saved["version"], 3);
    assert_eq!(saved["content"], "second draft");
}

#[tokio::test(flavor = "multi_thread")]
async fn mentions_only_keep_team_members() {
    let app = test_app().await;
    let (token, owner_id, team) = app.owner_with_team().await;
    let (_, outsider_id) = app.register("eve@example.com", "Eve").await;

    let content = format!(
        "Ping @[Olive]({}) and @[Eve]({}) and @[Olive]({})",
        owner_id, outsider_id, owner_id
    );
    let doc = create_doc(
        &app,
        &token,
        &team,
        json!({"title": "Standup", "content": content}),
    )
    .await;
    assert_eq!(doc["mentions"], json!([owner_id]));

    let response = app
        .call(
            "PATCH",
            &format!("/api/v1/documents/{}", id_of(&doc)),
            &token,
            &team,
            Some(json!({"content": "nobody here"})),
        )
        .await;
    assert_eq!(json_body(response).await["mentions"], json!([]));
}

#[tokio::test(flavor = "multi_thread")]
async fn tree_and_children_follow_sibling_order() {
    let app = test_app().await;
    let (token, _, team) = app.owner_with_team().await;

    let root = create_doc(&app, &token, &team, json!({"title": "Handbook"})).await;
    let root_id = id_of(&root);
    for (title, idx) in [("Zeta", Some(0)), ("Alpha", None), ("Beta", Some(1))] {
        create_doc(
            &app,
            &token,
            &team,
            json!({"title": title, "parent_id": root_id, "idx": idx}),
        )
        .await;
    }

    let response = app
        .call(
            "GET",
            &format!("/api/v1/documents/{}/children", root_id),
            &token,
            &team,
            None,
        )
        .await;
    let children = json_body(response).await;
    let titles: Vec<&str> = children
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Zeta", "Beta", "Alpha"]);

    let response = app
        .call("GET", "/api/v1/documents/tree", &token, &team, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let tree = json_body(response).await;
    assert_eq!(tree.as_array().unwrap().len(), 1);
    assert_eq!(tree[0]["title"], "Handbook");
    assert_eq!(tree[0]["children"].as_array().unwrap().len(), 3);
    assert_eq!(tree[0]["children"][0]["title"], "Zeta");

    let response = app
        .call("GET", "/api/v1/documents?parent_id=root", &token, &team, None)
        .await;
    assert_eq!(json_body(response).await["total"], 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn move_rejects_cycles() {
    let app = test_app().await;
    let (token, _, team) = app.owner_with_team().await;

    let a = id_of(&create_doc(&app, &token, &team, json!({"title": "A"})).await);
    let b = id_of(&create_doc(&app, &token, &team, json!({"title": "B", "parent_id": a})).await);
    let c = id_of(&create_doc(&app, &token, &team, json!({"title": "C"})).await);

    let response = app
        .call(
            "POST",
            &format!("/api/v1/documents/{}/move", a),
            &token,
            &team,
            Some(json!({"parent_id": b})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .call(
            "POST",
            &format!("/api/v1/documents/{}/move", a),
            &token,
            &team,
            Some(json!({"parent_id": a})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .call(
            "POST",
            &format!("/api/v1/documents/{}/move", a),
            &token,
            &team,
            Some(json!({"parent_id": "deadbeef"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .call(
            "POST",
            &format!("/api/v1/documents/{}/move", b),
            &token,
            &team,
            Some(json!({"parent_id": c, "idx": 0})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let moved = json_body(response).await;
    assert_eq!(moved["parent_id"], c.as_str());

    let response = app
        .call(
            "POST",
            &format!("/api/v1/documents/{}/move", b),
            &token,
            &team,
            Some(json!({"parent_id": null})),
        )
        .await;
    assert!(json_body(response).await["parent_id"].is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_removes_the_subtree() {
    let app = test_app().await;
    let (token, _, team) = app.owner_with_team().await;

    let parent = id_of(&create_doc(&app, &token, &team, json!({"title": "Parent"})).await);
    let child =
        id_of(&create_doc(&app, &token, &team, json!({"title": "Child", "parent_id": parent})).await);

    let response = app
        .call(
            "DELETE",
            &format!("/api/v1/documents/{}", parent),
            &token,
            &team,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .call(
            "GET",
            &format!("/api/v1/documents/{}", child),
            &token,
            &team,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn documents_do_not_leak_across_teams() {
    let app = test_app().await;
    let (token, _, team) = app.owner_with_team().await;
    let other = app.create_team(&token, "Other").await;
    let doc = id_of(&create_doc(&app, &token, &team, json!({"title": "Private"})).await);

    let response = app
        .call(
            "PATCH",
            &format!("/api/v1/documents/{}", doc),
            &token,
            &other,
            Some(json!({"title": "Mine now"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .call(
            "POST",
            "/api/v1/documents",
            &token,
            &other,
            Some(json!({"title": "Sneaky", "parent_id": doc})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreadable_bodies_are_json_bad_requests() {
    let app = test_app().await;
    let (token, _, team) = app.owner_with_team().await;

    let response = app
        .call(
            "POST",
            "/api/v1/documents",
            &token,
            &team,
            Some(json!({"content": "no title"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(
        body["error"].as_str().unwrap().contains("title"),
        "error was {}",
        body
    );

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/v1/documents")
                .header("authorization", format!("Bearer {}", token))
                .header("x-team-id", &team)
                .header("content-type", "application/json")
                .body(Body::from("{\"title\": "))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());

    let response = app
        .call(
            "PATCH",
            "/api/v1/documents/deadbeef",
            &token,
            &team,
            Some(json!({"expected_version": "one"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}
