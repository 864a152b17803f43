//! Shared fixtures for API integration tests.

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use super::extract::TEAM_HEADER;
use super::{AppState, ChangeNotifier, Config, routes};
use crate::db::{Database, SqliteDatabase};
use crate::storage::FsScreenshotStore;

/// Router over an in-memory database and a temporary screenshot store.
pub(crate) struct TestApp {
    pub router: Router,
    pub state: AppState<SqliteDatabase, FsScreenshotStore>,
    _blobs: TempDir,
}

pub(crate) async fn test_app() -> TestApp {
    test_app_with(Config::default()).await
}

pub(crate) async fn test_app_with(config: Config) -> TestApp {
    let db = SqliteDatabase::in_memory().await.unwrap();
    db.migrate().await.unwrap();
    let blobs = TempDir::new().unwrap();
    let store = FsScreenshotStore::new(blobs.path());
    let state = AppState::new(db, store, ChangeNotifier::new(), config);
    TestApp {
        router: routes::create_router(state.clone(), false),
        state,
        _blobs: blobs,
    }
}

/// Build a request with optional bearer token, team header and JSON body.
pub(crate) fn api_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    team_id: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    if let Some(team_id) = team_id {
        builder = builder.header(TEAM_HEADER, team_id);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Helper to parse JSON response body
pub(crate) async fn json_body(response: Response<Body>) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Send a team-scoped request.
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: &str,
        team_id: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        self.send(api_request(method, uri, Some(token), Some(team_id), body))
            .await
    }

    /// Register a user, returning (token, user id).
    pub async fn register(&self, email: &str, name: &str) -> (String, String) {
        let response = self
            .send(api_request(
                "POST",
                "/api/v1/auth/register",
                None,
                None,
                Some(json!({"email": email, "name": name, "password": "correct horse"})),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    /// Create a team owned by the token's user.
    pub async fn create_team(&self, token: &str, name: &str) -> String {
        let response = self
            .send(api_request(
                "POST",
                "/api/v1/teams",
                Some(token),
                None,
                Some(json!({"name": name})),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await["id"].as_str().unwrap().to_string()
    }

    /// Add a registered user to a team with the given role.
    pub async fn add_member(&self, admin_token: &str, team_id: &str, email: &str, role: &str) {
        let response = self
            .send(api_request(
                "POST",
                &format!("/api/v1/teams/{}/members", team_id),
                Some(admin_token),
                None,
                Some(json!({"email": email, "role": role})),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    /// An owner with a fresh team: (token, user id, team id).
    pub async fn owner_with_team(&self) -> (String, String, String) {
        let (token, user_id) = self.register("owner@example.com", "Olive Owner").await;
        let team_id = self.create_team(&token, "Acme").await;
        (token, user_id, team_id)
    }
}
