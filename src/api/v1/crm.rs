//! CRM handlers: tags and clients.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use super::{ErrorResponse, HandlerResult, bad_request, db_error, non_blank, parse_order};
use crate::api::notifier::UpdateMessage;
use crate::api::{AppState, JsonBody, TeamScope};
use crate::db::{
    ClientQuery, CrmClient, CrmClientRepository, CrmTag, CrmTagRepository, Database, PageSort,
};
use crate::serde_utils::apply_clearable;
use crate::storage::ScreenshotStore;

/// Color given to tags created without one.
pub const DEFAULT_TAG_COLOR: &str = "#6b7280";

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TagResponse {
    #[schema(example = "a1b2c3d4")]
    pub id: String,
    #[schema(example = "Enterprise")]
    pub name: String,
    #[schema(example = "#6b7280")]
    pub color: String,
    pub created_at: String,
}

impl From<CrmTag> for TagResponse {
    fn from(t: CrmTag) -> Self {
        Self {
            id: t.id,
            name: t.name,
            color: t.color,
            created_at: t.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTagRequest {
    #[schema(example = "Enterprise")]
    pub name: String,
    /// `#RRGGBB`
    #[schema(example = "#2563eb")]
    pub color: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PatchTagRequest {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClientResponse {
    #[schema(example = "a1b2c3d4")]
    pub id: String,
    #[schema(example = "Grace Hopper")]
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
    #[schema(example = json!(["tag0001a"]))]
    pub tag_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CrmClient> for ClientResponse {
    fn from(c: CrmClient) -> Self {
        Self {
            id: c.id,
            name: c.name,
            email: c.email,
            phone: c.phone,
            company: c.company,
            notes: c.notes,
            tag_ids: c.tag_ids,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateClientRequest {
    #[schema(example = "Grace Hopper")]
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
    /// Tags of the same team
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PatchClientRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::serde_utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::serde_utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::serde_utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub company: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::serde_utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    /// Replaces all tag links when present
    pub tag_ids: Option<Vec<String>>,
}

impl PatchClientRequest {
    fn merge_into(self, target: &mut CrmClient) -> HandlerResult<()> {
        if let Some(name) = self.name {
            target.name = required_name(&name, "Client")?;
        }
        apply_clearable(&mut target.email, self.email);
        apply_clearable(&mut target.phone, self.phone);
        apply_clearable(&mut target.company, self.company);
        apply_clearable(&mut target.notes, self.notes);
        if let Some(tag_ids) = self.tag_ids {
            target.tag_ids = tag_ids;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListClientsQuery {
    /// Substring match on name, email or company
    #[param(example = "acme")]
    pub q: Option<String>,
    /// Only clients carrying this tag
    #[param(example = "a1b2c3d4")]
    pub tag_id: Option<String>,
    #[param(example = 20)]
    pub limit: Option<usize>,
    #[param(example = 0)]
    pub offset: Option<usize>,
    /// Field to sort by (name, email, company, created_at, updated_at)
    #[param(example = "name")]
    pub sort: Option<String>,
    /// Sort order (asc, desc)
    #[param(example = "asc")]
    pub order: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedClients {
    pub items: Vec<ClientResponse>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

// =============================================================================
// Helpers
// =============================================================================

fn required_name(name: &str, what: &str) -> HandlerResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(bad_request(format!("{} name must not be empty", what)));
    }
    Ok(name.to_string())
}

/// Accept `#RRGGBB` only, normalized to lowercase.
pub(crate) fn parse_color(color: &str) -> HandlerResult<String> {
    let color = color.trim();
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(bad_request(format!(
            "Invalid color '{}': expected #RRGGBB",
            color
        )));
    }
    Ok(color.to_ascii_lowercase())
}

// =============================================================================
// Tag handlers
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/v1/crm/tags",
    tag = "crm",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Tags ordered by name", body = Vec<TagResponse>)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn list_tags<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
) -> HandlerResult<Json<Vec<TagResponse>>> {
    let tags = state
        .db()
        .crm_tags()
        .list(&scope.team_id)
        .await
        .map_err(db_error)?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/crm/tags",
    tag = "crm",
    request_body = CreateTagRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Tag created", body = TagResponse),
        (status = 400, description = "Invalid name or color", body = ErrorResponse),
        (status = 409, description = "Tag name already used", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn create_tag<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    JsonBody(req): JsonBody<CreateTagRequest>,
) -> HandlerResult<(StatusCode, Json<TagResponse>)> {
    let tag = CrmTag {
        id: String::new(),
        team_id: scope.team_id.clone(),
        name: required_name(&req.name, "Tag")?,
        color: parse_color(req.color.as_deref().unwrap_or(DEFAULT_TAG_COLOR))?,
        created_at: String::new(),
    };
    let created = state
        .db()
        .crm_tags()
        .create(&tag)
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::CrmTagCreated {
            tag_id: created.id.clone(),
        },
    );

    Ok((StatusCode::CREATED, Json(TagResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/crm/tags/{id}",
    tag = "crm",
    params(("id" = String, Path, description = "Tag ID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Tag found", body = TagResponse),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn get_tag<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
) -> HandlerResult<Json<TagResponse>> {
    let tag = state
        .db()
        .crm_tags()
        .get(&scope.team_id, &id)
        .await
        .map_err(db_error)?;
    Ok(Json(TagResponse::from(tag)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/crm/tags/{id}",
    tag = "crm",
    params(("id" = String, Path, description = "Tag ID")),
    request_body = PatchTagRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Tag updated", body = TagResponse),
        (status = 404, description = "Tag not found", body = ErrorResponse),
        (status = 409, description = "Tag name already used", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn patch_tag<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<PatchTagRequest>,
) -> HandlerResult<Json<TagResponse>> {
    let mut tag = state
        .db()
        .crm_tags()
        .get(&scope.team_id, &id)
        .await
        .map_err(db_error)?;

    if let Some(name) = &req.name {
        tag.name = required_name(name, "Tag")?;
    }
    if let Some(color) = &req.color {
        tag.color = parse_color(color)?;
    }

    let updated = state
        .db()
        .crm_tags()
        .update(&tag)
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::CrmTagUpdated { tag_id: id.clone() },
    );

    Ok(Json(TagResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/crm/tags/{id}",
    tag = "crm",
    params(("id" = String, Path, description = "Tag ID")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Tag deleted and unlinked from clients"),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn delete_tag<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
) -> HandlerResult<StatusCode> {
    state
        .db()
        .crm_tags()
        .delete(&scope.team_id, &id)
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::CrmTagDeleted { tag_id: id.clone() },
    );

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Client handlers
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/v1/crm/clients",
    tag = "crm",
    params(ListClientsQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Paginated list of clients", body = PaginatedClients)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn list_clients<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Query(query): Query<ListClientsQuery>,
) -> HandlerResult<Json<PaginatedClients>> {
    let db_query = ClientQuery {
        page: PageSort {
            limit: query.limit,
            offset: query.offset,
            sort_by: query.sort.clone(),
            sort_order: parse_order(query.order.as_deref()),
        },
        tag_id: non_blank(query.tag_id.clone()),
        search: non_blank(query.q.clone()),
    };

    let result = state
        .db()
        .crm_clients()
        .list(&scope.team_id, Some(&db_query))
        .await
        .map_err(db_error)?;

    Ok(Json(PaginatedClients {
        items: result.items.into_iter().map(ClientResponse::from).collect(),
        total: result.total,
        limit: result.limit.unwrap_or(result.total),
        offset: result.offset,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/crm/clients",
    tag = "crm",
    request_body = CreateClientRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Client created", body = ClientResponse),
        (status = 400, description = "Invalid input or unknown tag", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope, req), fields(team_id = %scope.team_id))]
pub async fn create_client<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    JsonBody(req): JsonBody<CreateClientRequest>,
) -> HandlerResult<(StatusCode, Json<ClientResponse>)> {
    let client = CrmClient {
        id: String::new(),
        team_id: scope.team_id.clone(),
        name: required_name(&req.name, "Client")?,
        email: non_blank(req.email),
        phone: non_blank(req.phone),
        company: non_blank(req.company),
        notes: non_blank(req.notes),
        tag_ids: req.tag_ids,
        created_at: String::new(),
        updated_at: String::new(),
    };
    let created = state
        .db()
        .crm_clients()
        .create(&client)
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::CrmClientCreated {
            client_id: created.id.clone(),
        },
    );

    Ok((StatusCode::CREATED, Json(ClientResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/crm/clients/{id}",
    tag = "crm",
    params(("id" = String, Path, description = "Client ID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Client found", body = ClientResponse),
        (status = 404, description = "Client not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn get_client<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
) -> HandlerResult<Json<ClientResponse>> {
    let client = state
        .db()
        .crm_clients()
        .get(&scope.team_id, &id)
        .await
        .map_err(db_error)?;
    Ok(Json(ClientResponse::from(client)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/crm/clients/{id}",
    tag = "crm",
    params(("id" = String, Path, description = "Client ID")),
    request_body = PatchClientRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Client updated", body = ClientResponse),
        (status = 400, description = "Invalid input or unknown tag", body = ErrorResponse),
        (status = 404, description = "Client not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope, req), fields(team_id = %scope.team_id))]
pub async fn patch_client<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<PatchClientRequest>,
) -> HandlerResult<Json<ClientResponse>> {
    let mut client = state
        .db()
        .crm_clients()
        .get(&scope.team_id, &id)
        .await
        .map_err(db_error)?;

    req.merge_into(&mut client)?;

    let updated = state
        .db()
        .crm_clients()
        .update(&client)
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::CrmClientUpdated {
            client_id: id.clone(),
        },
    );

    Ok(Json(ClientResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/crm/clients/{id}",
    tag = "crm",
    params(("id" = String, Path, description = "Client ID")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Client deleted"),
        (status = 404, description = "Client not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn delete_client<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
) -> HandlerResult<StatusCode> {
    state
        .db()
        .crm_clients()
        .delete(&scope.team_id, &id)
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::CrmClientDeleted {
            client_id: id.clone(),
        },
    );

    Ok(StatusCode::NO_CONTENT)
}
