//! Team and membership handlers.
//!
//! Team routes address the team through the path rather than the
//! `X-Team-Id` header.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::users::UserResponse;
use super::{ErrorResponse, HandlerResult, bad_request, db_error, forbidden, require_role};
use crate::api::extract::team_scope;
use crate::api::notifier::UpdateMessage;
use crate::api::{AppState, AuthUser, JsonBody, TeamScope};
use crate::db::{Database, Team, TeamMember, TeamMembership, TeamRepository, TeamRole, UserRepository};
use crate::storage::ScreenshotStore;

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamResponse {
    #[schema(example = "a1b2c3d4")]
    pub id: String,
    #[schema(example = "Acme")]
    pub name: String,
    /// The caller's role in this team
    #[schema(example = "owner")]
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TeamResponse {
    fn new(team: Team, role: TeamRole) -> Self {
        Self {
            id: team.id,
            name: team.name,
            role: role.to_string(),
            created_at: team.created_at,
            updated_at: team.updated_at,
        }
    }
}

impl From<TeamMembership> for TeamResponse {
    fn from(m: TeamMembership) -> Self {
        Self::new(m.team, m.role)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MemberResponse {
    pub user: UserResponse,
    #[schema(example = "member")]
    pub role: String,
    pub joined_at: String,
}

impl From<TeamMember> for MemberResponse {
    fn from(m: TeamMember) -> Self {
        Self {
            user: UserResponse::from(m.user),
            role: m.role.to_string(),
            joined_at: m.joined_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TeamRequest {
    #[schema(example = "Acme")]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    #[schema(example = "grace@example.com")]
    pub email: String,
    /// owner, admin or member (default member)
    #[schema(example = "member")]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMemberRequest {
    #[schema(example = "admin")]
    pub role: String,
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_role(role: Option<&str>) -> HandlerResult<TeamRole> {
    match role {
        None => Ok(TeamRole::Member),
        Some(role) => role.parse().map_err(bad_request),
    }
}

fn team_name(name: &str) -> HandlerResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(bad_request("Team name must not be empty"));
    }
    Ok(name.to_string())
}

/// Scope for a team addressed by path: 404 if it does not exist, 403 if
/// the caller is not a member.
async fn path_scope<D: Database, S: ScreenshotStore + Send + Sync>(
    state: &AppState<D, S>,
    auth: AuthUser,
    team_id: &str,
) -> HandlerResult<(Team, TeamScope)> {
    let team = state.db().teams().get(team_id).await.map_err(db_error)?;
    let scope = team_scope(state.db(), auth.user, team_id).await?;
    Ok((team, scope))
}

/// Only owners may hand out or take away the owner role.
fn check_owner_change(scope: &TeamScope, from: Option<TeamRole>, to: TeamRole) -> HandlerResult<()> {
    let touches_owner = to == TeamRole::Owner || from == Some(TeamRole::Owner);
    if touches_owner && scope.role != TeamRole::Owner {
        return Err(forbidden("Only owners can grant or revoke the owner role"));
    }
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/v1/teams",
    tag = "teams",
    request_body = TeamRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Team created, caller is owner", body = TeamResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn create_team<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    auth: AuthUser,
    JsonBody(req): JsonBody<TeamRequest>,
) -> HandlerResult<(StatusCode, Json<TeamResponse>)> {
    let team = Team {
        id: String::new(),
        name: team_name(&req.name)?,
        created_at: String::new(),
        updated_at: String::new(),
    };
    let team = state
        .db()
        .teams()
        .create(&team, &auth.user.id)
        .await
        .map_err(db_error)?;
    info!(team_id = %team.id, "created team");

    Ok((
        StatusCode::CREATED,
        Json(TeamResponse::new(team, TeamRole::Owner)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/teams",
    tag = "teams",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Teams of the caller", body = Vec<TeamResponse>)
    )
)]
#[instrument(skip(state, auth))]
pub async fn list_teams<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    auth: AuthUser,
) -> HandlerResult<Json<Vec<TeamResponse>>> {
    let teams = state
        .db()
        .teams()
        .list_for_user(&auth.user.id)
        .await
        .map_err(db_error)?;
    Ok(Json(teams.into_iter().map(TeamResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/teams/{id}",
    tag = "teams",
    params(("id" = String, Path, description = "Team ID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Team found", body = TeamResponse),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Team not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn get_team<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> HandlerResult<Json<TeamResponse>> {
    let (team, scope) = path_scope(&state, auth, &id).await?;
    Ok(Json(TeamResponse::new(team, scope.role)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/teams/{id}",
    tag = "teams",
    params(("id" = String, Path, description = "Team ID")),
    request_body = TeamRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Team renamed", body = TeamResponse),
        (status = 403, description = "Requires admin role", body = ErrorResponse),
        (status = 404, description = "Team not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn update_team<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    auth: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<TeamRequest>,
) -> HandlerResult<Json<TeamResponse>> {
    let (mut team, scope) = path_scope(&state, auth, &id).await?;
    require_role(scope.role, TeamRole::Admin)?;

    team.name = team_name(&req.name)?;
    let team = state.db().teams().update(&team).await.map_err(db_error)?;

    state
        .notifier()
        .notify(&id, UpdateMessage::TeamUpdated { team_id: id.clone() });

    Ok(Json(TeamResponse::new(team, scope.role)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/teams/{id}",
    tag = "teams",
    params(("id" = String, Path, description = "Team ID")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Team and all its data deleted"),
        (status = 403, description = "Requires owner role", body = ErrorResponse),
        (status = 404, description = "Team not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn delete_team<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> HandlerResult<StatusCode> {
    let (_, scope) = path_scope(&state, auth, &id).await?;
    require_role(scope.role, TeamRole::Owner)?;

    state.db().teams().delete(&id).await.map_err(db_error)?;
    info!(team_id = %id, "deleted team");

    state
        .notifier()
        .notify(&id, UpdateMessage::TeamDeleted { team_id: id.clone() });

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/teams/{id}/members",
    tag = "teams",
    params(("id" = String, Path, description = "Team ID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Team members", body = Vec<MemberResponse>),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Team not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn list_members<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> HandlerResult<Json<Vec<MemberResponse>>> {
    path_scope(&state, auth, &id).await?;
    let members = state
        .db()
        .teams()
        .list_members(&id)
        .await
        .map_err(db_error)?;
    Ok(Json(members.into_iter().map(MemberResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/teams/{id}/members",
    tag = "teams",
    params(("id" = String, Path, description = "Team ID")),
    request_body = AddMemberRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Member added", body = MemberResponse),
        (status = 403, description = "Requires admin role", body = ErrorResponse),
        (status = 404, description = "No user with that email", body = ErrorResponse),
        (status = 409, description = "Already a member", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn add_member<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    auth: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<AddMemberRequest>,
) -> HandlerResult<(StatusCode, Json<MemberResponse>)> {
    let (_, scope) = path_scope(&state, auth, &id).await?;
    require_role(scope.role, TeamRole::Admin)?;
    let role = parse_role(req.role.as_deref())?;
    check_owner_change(&scope, None, role)?;

    let email = crate::auth::normalize_email(&req.email);
    let user = state
        .db()
        .users()
        .get_by_email(&email)
        .await
        .map_err(db_error)?
        .ok_or_else(|| db_error(crate::db::DbError::not_found("User", &email)))?;

    let member = state
        .db()
        .teams()
        .add_member(&id, &user.id, role)
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &id,
        UpdateMessage::MemberAdded {
            user_id: user.id.clone(),
        },
    );

    Ok((StatusCode::CREATED, Json(MemberResponse::from(member))))
}

#[utoipa::path(
    patch,
    path = "/api/v1/teams/{id}/members/{user_id}",
    tag = "teams",
    params(
        ("id" = String, Path, description = "Team ID"),
        ("user_id" = String, Path, description = "User ID")
    ),
    request_body = UpdateMemberRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Role changed", body = MemberResponse),
        (status = 403, description = "Insufficient role", body = ErrorResponse),
        (status = 404, description = "Not a member", body = ErrorResponse),
        (status = 409, description = "Would leave the team without an owner", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn update_member<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    auth: AuthUser,
    Path((id, user_id)): Path<(String, String)>,
    JsonBody(req): JsonBody<UpdateMemberRequest>,
) -> HandlerResult<Json<MemberResponse>> {
    let (_, scope) = path_scope(&state, auth, &id).await?;
    require_role(scope.role, TeamRole::Admin)?;
    let role = parse_role(Some(&req.role))?;

    let current = state
        .db()
        .teams()
        .get_role(&id, &user_id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| db_error(crate::db::DbError::not_found("TeamMember", &user_id)))?;
    check_owner_change(&scope, Some(current), role)?;

    let member = state
        .db()
        .teams()
        .set_role(&id, &user_id, role)
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &id,
        UpdateMessage::MemberUpdated {
            user_id: user_id.clone(),
        },
    );

    Ok(Json(MemberResponse::from(member)))
}

/// Remove a member
///
/// Admins remove others; anyone may leave.
#[utoipa::path(
    delete,
    path = "/api/v1/teams/{id}/members/{user_id}",
    tag = "teams",
    params(
        ("id" = String, Path, description = "Team ID"),
        ("user_id" = String, Path, description = "User ID")
    ),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Member removed"),
        (status = 403, description = "Insufficient role", body = ErrorResponse),
        (status = 404, description = "Not a member", body = ErrorResponse),
        (status = 409, description = "Last owner cannot leave", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn remove_member<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    auth: AuthUser,
    Path((id, user_id)): Path<(String, String)>,
) -> HandlerResult<StatusCode> {
    let (_, scope) = path_scope(&state, auth, &id).await?;

    if scope.user.id != user_id {
        require_role(scope.role, TeamRole::Admin)?;
        let current = state
            .db()
            .teams()
            .get_role(&id, &user_id)
            .await
            .map_err(db_error)?;
        if current == Some(TeamRole::Owner) && scope.role != TeamRole::Owner {
            return Err(forbidden("Only owners can remove an owner"));
        }
    }

    state
        .db()
        .teams()
        .remove_member(&id, &user_id)
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &id,
        UpdateMessage::MemberRemoved {
            user_id: user_id.clone(),
        },
    );

    Ok(StatusCode::NO_CONTENT)
}
