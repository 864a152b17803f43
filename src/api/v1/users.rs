//! User profile and member lookup handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use super::{ErrorResponse, HandlerResult, bad_request, db_error, non_blank};
use crate::api::{AppState, AuthUser, JsonBody, TeamScope};
use crate::db::{Database, User, UserRepository};
use crate::serde_utils::apply_clearable;
use crate::storage::ScreenshotStore;
use crate::wiki::MENTION_SUGGESTION_LIMIT;

// =============================================================================
// DTOs
// =============================================================================

/// User response DTO. The password hash is never exposed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = "a1b2c3d4")]
    pub id: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    pub avatar_url: Option<String>,
    #[schema(example = "2025-01-01 00:00:00")]
    pub created_at: String,
    #[schema(example = "2025-01-01 00:00:00")]
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            avatar_url: u.avatar_url,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PatchUserRequest {
    #[schema(example = "Ada King")]
    pub name: Option<String>,
    /// Set to null to clear the avatar
    #[serde(default, deserialize_with = "crate::serde_utils::double_option")]
    #[schema(value_type = Option<String>, example = "https://example.com/ada.png")]
    pub avatar_url: Option<Option<String>>,
}

impl PatchUserRequest {
    fn merge_into(self, target: &mut User) -> HandlerResult<()> {
        if let Some(name) = self.name {
            target.name =
                non_blank(Some(name)).ok_or_else(|| bad_request("Name must not be empty"))?;
        }
        apply_clearable(&mut target.avatar_url, self.avatar_url);
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchUsersQuery {
    /// Name or email prefix (case-insensitive)
    #[param(example = "ad")]
    pub q: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

#[utoipa::path(
    patch,
    path = "/api/v1/users/me",
    tag = "users",
    request_body = PatchUserRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn patch_me<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    auth: AuthUser,
    JsonBody(req): JsonBody<PatchUserRequest>,
) -> HandlerResult<Json<UserResponse>> {
    let mut user = auth.user;
    req.merge_into(&mut user)?;

    let updated = state.db().users().update(&user).await.map_err(db_error)?;
    Ok(Json(UserResponse::from(updated)))
}

/// Mention autocomplete
///
/// Members of the current team whose name or email starts with `q`.
#[utoipa::path(
    get,
    path = "/api/v1/users/search",
    tag = "users",
    params(SearchUsersQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Matching team members", body = Vec<UserResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not a member of the team", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn search_users<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Query(query): Query<SearchUsersQuery>,
) -> HandlerResult<Json<Vec<UserResponse>>> {
    let prefix = query.q.unwrap_or_default();
    let users = state
        .db()
        .users()
        .search_members(&scope.team_id, prefix.trim(), MENTION_SUGGESTION_LIMIT)
        .await
        .map_err(db_error)?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}
