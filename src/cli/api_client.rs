use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::cli::error::{CliError, CliResult};

pub const DEFAULT_API_URL: &str = "http://localhost:3737";

/// API client for communicating with the DocuFlow REST API
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    team: Option<String>,
    client: Client,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// `api_url`, `token` and `team` come from clap, which already folds in
    /// `DOCUFLOW_API_URL`, `DOCUFLOW_TOKEN` and `DOCUFLOW_TEAM`.
    pub fn new(api_url: Option<String>, token: Option<String>, team: Option<String>) -> Self {
        let base_url = api_url
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            base_url,
            token,
            team,
            client: Client::new(),
        }
    }

    /// Get the base URL being used
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the bearer token and team header.
    fn scoped(&self, builder: RequestBuilder) -> CliResult<RequestBuilder> {
        let token = self.token.as_deref().ok_or(CliError::MissingToken)?;
        let team = self.team.as_deref().ok_or(CliError::MissingTeam)?;
        Ok(builder.bearer_auth(token).header("X-Team-Id", team))
    }

    /// Create a team-scoped GET request builder
    pub fn get(&self, path: &str) -> CliResult<RequestBuilder> {
        self.scoped(self.client.get(self.url(path)))
    }

    /// Create a team-scoped POST request builder
    pub fn post(&self, path: &str) -> CliResult<RequestBuilder> {
        self.scoped(self.client.post(self.url(path)))
    }

    /// Handle API response with standardized error handling
    ///
    /// Returns the deserialized response body on success,
    /// or a CliError::ApiError on non-success status codes.
    pub async fn handle_response<T: DeserializeOwned>(response: Response) -> CliResult<T> {
        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| CliError::InvalidResponse {
                    message: e.to_string(),
                })
        } else {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            // Prefer the server's {"error": "..."} message
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["error"].as_str().map(str::to_string))
                .unwrap_or(body);
            Err(CliError::ApiError { status, message })
        }
    }
}
