//! Project management handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use super::{
    ErrorResponse, HandlerResult, bad_request, db_error, non_blank, parse_order, split_csv,
};
use crate::api::notifier::UpdateMessage;
use crate::api::{AppState, JsonBody, TeamScope};
use crate::db::{Database, PageSort, Project, ProjectQuery, ProjectRepository};
use crate::serde_utils::apply_clearable;
use crate::storage::ScreenshotStore;

// =============================================================================
// DTOs (Data Transfer Objects)
// =============================================================================

/// Project response DTO
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProjectResponse {
    /// Unique identifier (8-character hex)
    #[schema(example = "a1b2c3d4")]
    pub id: String,
    /// Project title
    #[schema(example = "Website relaunch")]
    pub title: String,
    /// Optional description
    #[schema(example = "Everything about the new site")]
    pub description: Option<String>,
    #[schema(example = json!(["web", "q3"]))]
    pub tags: Vec<String>,
    /// Creation timestamp
    #[schema(example = "2025-01-01 00:00:00")]
    pub created_at: String,
    /// Last update timestamp
    #[schema(example = "2025-01-01 00:00:00")]
    pub updated_at: String,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            tags: p.tags,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Create/replace project request DTO
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProjectRequest {
    #[schema(example = "Website relaunch")]
    pub title: String,
    #[schema(example = "Everything about the new site")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PatchProjectRequest {
    #[schema(example = "Website relaunch")]
    pub title: Option<String>,
    /// Set to null to clear
    #[serde(default, deserialize_with = "crate::serde_utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

impl PatchProjectRequest {
    fn merge_into(self, target: &mut Project) -> HandlerResult<()> {
        if let Some(title) = self.title {
            target.title = project_title(&title)?;
        }
        apply_clearable(&mut target.description, self.description);
        if let Some(tags) = self.tags {
            target.tags = tags;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListProjectsQuery {
    /// Filter by tags (comma-separated, any match)
    #[param(example = "web,q3")]
    pub tags: Option<String>,
    /// Substring match on title or description
    #[param(example = "site")]
    pub q: Option<String>,
    /// Maximum number of items to return
    #[param(example = 20)]
    pub limit: Option<usize>,
    /// Number of items to skip
    #[param(example = 0)]
    pub offset: Option<usize>,
    /// Field to sort by (title, created_at, updated_at)
    #[param(example = "created_at")]
    pub sort: Option<String>,
    /// Sort order (asc, desc)
    #[param(example = "desc")]
    pub order: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedProjects {
    pub items: Vec<ProjectResponse>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

fn project_title(title: &str) -> HandlerResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(bad_request("Project title must not be empty"));
    }
    Ok(title.to_string())
}

// =============================================================================
// Handlers
// =============================================================================

/// List projects
///
/// Returns a paginated list of the team's projects
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    tag = "projects",
    params(ListProjectsQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Paginated list of projects", body = PaginatedProjects),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn list_projects<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Query(query): Query<ListProjectsQuery>,
) -> HandlerResult<Json<PaginatedProjects>> {
    let db_query = ProjectQuery {
        page: PageSort {
            limit: query.limit,
            offset: query.offset,
            sort_by: query.sort.clone(),
            sort_order: parse_order(query.order.as_deref()),
        },
        tags: split_csv(query.tags.as_deref()),
        search: non_blank(query.q.clone()),
    };

    let result = state
        .db()
        .projects()
        .list(&scope.team_id, Some(&db_query))
        .await
        .map_err(db_error)?;

    Ok(Json(PaginatedProjects {
        items: result.items.into_iter().map(ProjectResponse::from).collect(),
        total: result.total,
        limit: result.limit.unwrap_or(result.total),
        offset: result.offset,
    }))
}

/// Get a project by ID
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}",
    tag = "projects",
    params(("id" = String, Path, description = "Project ID (8-character hex)")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Project found", body = ProjectResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn get_project<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
) -> HandlerResult<Json<ProjectResponse>> {
    let project = state
        .db()
        .projects()
        .get(&scope.team_id, &id)
        .await
        .map_err(db_error)?;

    Ok(Json(ProjectResponse::from(project)))
}

/// Create a new project
#[utoipa::path(
    post,
    path = "/api/v1/projects",
    tag = "projects",
    request_body = ProjectRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn create_project<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    JsonBody(req): JsonBody<ProjectRequest>,
) -> HandlerResult<(StatusCode, Json<ProjectResponse>)> {
    // Repository generates ID and timestamps
    let project = Project {
        id: String::new(),
        team_id: scope.team_id.clone(),
        title: project_title(&req.title)?,
        description: non_blank(req.description),
        tags: req.tags,
        created_at: String::new(),
        updated_at: String::new(),
    };

    let created = state
        .db()
        .projects()
        .create(&project)
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::ProjectCreated {
            project_id: created.id.clone(),
        },
    );

    Ok((StatusCode::CREATED, Json(ProjectResponse::from(created))))
}

/// Replace a project
#[utoipa::path(
    put,
    path = "/api/v1/projects/{id}",
    tag = "projects",
    params(("id" = String, Path, description = "Project ID (8-character hex)")),
    request_body = ProjectRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Project updated", body = ProjectResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn update_project<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ProjectRequest>,
) -> HandlerResult<Json<ProjectResponse>> {
    let mut project = state
        .db()
        .projects()
        .get(&scope.team_id, &id)
        .await
        .map_err(db_error)?;

    project.title = project_title(&req.title)?;
    project.description = non_blank(req.description);
    project.tags = req.tags;

    let updated = state
        .db()
        .projects()
        .update(&project)
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::ProjectUpdated {
            project_id: id.clone(),
        },
    );

    Ok(Json(ProjectResponse::from(updated)))
}

/// Partially update a project
#[utoipa::path(
    patch,
    path = "/api/v1/projects/{id}",
    tag = "projects",
    params(("id" = String, Path, description = "Project ID (8-character hex)")),
    request_body = PatchProjectRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Project partially updated", body = ProjectResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn patch_project<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<PatchProjectRequest>,
) -> HandlerResult<Json<ProjectResponse>> {
    let mut project = state
        .db()
        .projects()
        .get(&scope.team_id, &id)
        .await
        .map_err(db_error)?;

    req.merge_into(&mut project)?;

    let updated = state
        .db()
        .projects()
        .update(&project)
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::ProjectUpdated {
            project_id: id.clone(),
        },
    );

    Ok(Json(ProjectResponse::from(updated)))
}

/// Delete a project
///
/// Documents and time entries keep existing without a project.
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{id}",
    tag = "projects",
    params(("id" = String, Path, description = "Project ID (8-character hex)")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 404, description = "Project not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn delete_project<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
) -> HandlerResult<StatusCode> {
    state
        .db()
        .projects()
        .delete(&scope.team_id, &id)
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::ProjectDeleted {
            project_id: id.clone(),
        },
    );

    Ok(StatusCode::NO_CONTENT)
}
