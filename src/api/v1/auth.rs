//! Registration, login and session handlers.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::users::UserResponse;
use super::{ErrorReply, ErrorResponse, HandlerResult, bad_request, db_error, error_reply, internal};
use crate::api::{AppState, AuthUser, JsonBody};
use crate::auth::{
    AuthError, generate_session_token, hash_password, hash_token, normalize_email,
    validate_email, validate_password, verify_password,
};
use crate::db::utils::{current_timestamp, timestamp_from_now};
use crate::db::{Database, Session, SessionRepository, User, UserRepository};
use crate::storage::ScreenshotStore;

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    #[schema(example = "correct horse battery")]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "correct horse battery")]
    pub password: String,
}

/// A fresh session. The token is only ever shown here.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    #[schema(example = "2025-02-01 00:00:00")]
    pub expires_at: String,
    pub user: UserResponse,
}

fn auth_error(e: AuthError) -> ErrorReply {
    match e {
        AuthError::InvalidCredentials => error_reply(StatusCode::UNAUTHORIZED, e.to_string()),
        AuthError::Validation { message } => bad_request(message),
        AuthError::Hash { .. } => internal(e),
    }
}

/// Store a new session for `user` and hand back the raw token.
async fn open_session<D: Database, S: ScreenshotStore + Send + Sync>(
    state: &AppState<D, S>,
    user: User,
) -> HandlerResult<SessionResponse> {
    let token = generate_session_token();
    let session = Session {
        token_hash: hash_token(&token),
        user_id: user.id.clone(),
        created_at: current_timestamp(),
        expires_at: timestamp_from_now(Duration::hours(state.config().session_ttl_hours)),
    };
    state
        .db()
        .sessions()
        .create(&session)
        .await
        .map_err(db_error)?;

    Ok(SessionResponse {
        token,
        expires_at: session.expires_at,
        user: UserResponse::from(user),
    })
}

// =============================================================================
// Handlers
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = SessionResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn register<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> HandlerResult<(StatusCode, Json<SessionResponse>)> {
    let email = normalize_email(&req.email);
    validate_email(&email).map_err(auth_error)?;
    validate_password(&req.password).map_err(auth_error)?;
    let name = req.name.trim();
    if name.is_empty() {
        return Err(bad_request("Name must not be empty"));
    }

    let user = User {
        id: String::new(),
        email,
        name: name.to_string(),
        password_hash: hash_password(&req.password).map_err(auth_error)?,
        avatar_url: None,
        created_at: String::new(),
        updated_at: String::new(),
    };
    let user = state.db().users().create(&user).await.map_err(db_error)?;
    info!(user_id = %user.id, "registered user");

    let session = open_session(&state, user).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse)
    )
)]
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn login<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> HandlerResult<Json<SessionResponse>> {
    let user = state
        .db()
        .users()
        .get_by_email(&normalize_email(&req.email))
        .await
        .map_err(db_error)?
        .filter(|user| verify_password(&req.password, &user.password_hash))
        .ok_or_else(|| auth_error(AuthError::InvalidCredentials))?;

    let session = open_session(&state, user).await?;
    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Session ended"),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn logout<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    auth: AuthUser,
) -> HandlerResult<StatusCode> {
    state
        .db()
        .sessions()
        .delete(&auth.token_hash)
        .await
        .map_err(db_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(auth))]
pub async fn me(auth: AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(auth.user))
}
