//! Request extractors for authentication, tenant selection and request
//! bodies.
//!
//! Every rejection is an [`ErrorReply`], so clients always get a JSON
//! `{"error": ...}` body.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::{HeaderMap, StatusCode, header, request::Parts};
use serde::de::DeserializeOwned;

use super::state::AppState;
use super::v1::{ErrorReply, db_error, error_reply};
use crate::auth::hash_token;
use crate::db::utils::current_timestamp;
use crate::db::{Database, SessionRepository, TeamRepository, TeamRole, User};
use crate::storage::ScreenshotStore;

/// Header carrying the id of the team a request acts on.
pub const TEAM_HEADER: &str = "x-team-id";

/// The caller, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    /// Digest of the presented token (identifies the session).
    pub token_hash: String,
}

/// An authenticated caller acting inside one of their teams.
#[derive(Debug, Clone)]
pub struct TeamScope {
    pub user: User,
    pub team_id: String,
    pub role: TeamRole,
}

impl TeamScope {
    pub fn is_admin(&self) -> bool {
        self.role.at_least(TeamRole::Admin)
    }
}

fn unauthorized(message: &str) -> ErrorReply {
    error_reply(StatusCode::UNAUTHORIZED, message)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve a raw session token to its user.
pub(crate) async fn authenticate<D: Database>(db: &D, token: &str) -> Result<AuthUser, ErrorReply> {
    let token_hash = hash_token(token);
    let user = db
        .sessions()
        .find_user(&token_hash, &current_timestamp())
        .await
        .map_err(db_error)?
        .ok_or_else(|| unauthorized("Invalid or expired session"))?;
    Ok(AuthUser { user, token_hash })
}

/// Resolve the caller's role in a team; non-members get 403.
pub(crate) async fn team_scope<D: Database>(
    db: &D,
    user: User,
    team_id: &str,
) -> Result<TeamScope, ErrorReply> {
    let role = db
        .teams()
        .get_role(team_id, &user.id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| error_reply(StatusCode::FORBIDDEN, "Not a member of this team"))?;
    Ok(TeamScope {
        user,
        team_id: team_id.to_string(),
        role,
    })
}

impl<D, S> FromRequestParts<AppState<D, S>> for AuthUser
where
    D: Database + 'static,
    S: ScreenshotStore + Send + Sync + 'static,
{
    type Rejection = ErrorReply;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<D, S>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| unauthorized("Missing bearer token"))?;
        authenticate(state.db(), token).await
    }
}

impl<D, S> FromRequestParts<AppState<D, S>> for TeamScope
where
    D: Database + 'static,
    S: ScreenshotStore + Send + Sync + 'static,
{
    type Rejection = ErrorReply;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<D, S>,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        let team_id = parts
            .headers
            .get(TEAM_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| error_reply(StatusCode::BAD_REQUEST, "Missing X-Team-Id header"))?
            .to_string();
        team_scope(state.db(), auth.user, &team_id).await
    }
}

/// Map a body rejection: oversized bodies keep 413, anything else is a 400.
fn body_rejection(status: StatusCode, message: String) -> ErrorReply {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        error_reply(StatusCode::PAYLOAD_TOO_LARGE, message)
    } else {
        error_reply(StatusCode::BAD_REQUEST, message)
    }
}

/// A JSON request body whose parse failures are reported as 400.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, St> FromRequest<St> for JsonBody<T>
where
    T: DeserializeOwned,
    St: Send + Sync,
{
    type Rejection = ErrorReply;

    async fn from_request(req: Request, state: &St) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(body_rejection(rejection.status(), rejection.body_text())),
        }
    }
}

/// Raw screenshot bytes, limited to `max_screenshot_bytes`.
#[derive(Debug, Clone)]
pub struct ImageBody(pub Bytes);

impl<D, S> FromRequest<AppState<D, S>> for ImageBody
where
    D: Database + 'static,
    S: ScreenshotStore + Send + Sync + 'static,
{
    type Rejection = ErrorReply;

    async fn from_request(req: Request, state: &AppState<D, S>) -> Result<Self, Self::Rejection> {
        let max = state.config().max_screenshot_bytes;
        let body = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                error_reply(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    format!("Screenshot exceeds {} bytes", max),
                )
            } else {
                body_rejection(rejection.status(), rejection.body_text())
            }
        })?;
        if body.len() > max {
            return Err(error_reply(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Screenshot exceeds {} bytes", max),
            ));
        }
        Ok(Self(body))
    }
}
