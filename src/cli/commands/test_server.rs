//! Spawned API server for CLI integration tests.

use tokio::net::TcpListener;

use crate::api::test_helpers::{TestApp, test_app};
use crate::cli::api_client::ApiClient;

pub(crate) struct TestServer {
    pub app: TestApp,
    pub url: String,
    pub token: String,
    pub team: String,
}

impl TestServer {
    /// A client acting as the seeded owner in the seeded team.
    pub fn client(&self) -> ApiClient {
        ApiClient::new(
            Some(self.url.clone()),
            Some(self.token.clone()),
            Some(self.team.clone()),
        )
    }
}

/// Spawn a test HTTP server with an in-memory database and one owner+team.
pub(crate) async fn spawn_test_server() -> TestServer {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let app = test_app().await;
    let (token, _, team) = app.owner_with_team().await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestServer {
        app,
        url,
        token,
        team,
    }
}
