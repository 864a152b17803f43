//! Wiki document handlers: listing, page tree, autosave and moves.

use std::collections::HashSet;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};

use super::{
    ErrorResponse, HandlerResult, bad_request, db_error, error_reply, non_blank, parse_order,
};
use crate::api::notifier::UpdateMessage;
use crate::api::{AppState, JsonBody, TeamScope};
use crate::db::{
    Database, Document, DocumentQuery, DocumentRepository, PageSort, ParentFilter,
    ProjectRepository, TeamRepository,
};
use crate::serde_utils::apply_clearable;
use crate::storage::ScreenshotStore;
use crate::wiki::{DocumentNode, build_tree, extract_mentions, would_create_cycle};

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    #[schema(example = "a1b2c3d4")]
    pub id: String,
    pub project_id: Option<String>,
    pub parent_id: Option<String>,
    #[schema(example = "Onboarding")]
    pub title: String,
    #[schema(example = "Welcome @[Ada Lovelace](a1b2c3d4)!")]
    pub content: String,
    #[schema(example = "📘")]
    pub icon: Option<String>,
    pub idx: Option<i64>,
    /// Incremented on every save
    #[schema(example = 3)]
    pub version: i64,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    /// Ids of mentioned team members
    pub mentions: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Document> for DocumentResponse {
    fn from(d: Document) -> Self {
        Self {
            id: d.id,
            project_id: d.project_id,
            parent_id: d.parent_id,
            title: d.title,
            content: d.content,
            icon: d.icon,
            idx: d.idx,
            version: d.version,
            created_by: d.created_by,
            updated_by: d.updated_by,
            mentions: d.mentions,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDocumentRequest {
    #[schema(example = "Onboarding")]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub icon: Option<String>,
    pub project_id: Option<String>,
    pub parent_id: Option<String>,
    pub idx: Option<i64>,
}

/// Autosave payload. Absent fields are left alone.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PatchDocumentRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    /// Set to null to clear
    #[serde(default, deserialize_with = "crate::serde_utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub icon: Option<Option<String>>,
    /// Set to null to detach from the project
    #[serde(default, deserialize_with = "crate::serde_utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub project_id: Option<Option<String>>,
    /// Reject the save with 409 unless the stored version matches
    pub expected_version: Option<i64>,
}

impl PatchDocumentRequest {
    fn merge_into(self, target: &mut Document) -> HandlerResult<()> {
        if let Some(title) = self.title {
            target.title = document_title(&title)?;
        }
        if let Some(content) = self.content {
            target.content = content;
        }
        apply_clearable(&mut target.icon, self.icon);
        apply_clearable(&mut target.project_id, self.project_id);
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MoveDocumentRequest {
    /// New parent, or null for top level
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Position among the new siblings
    pub idx: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListDocumentsQuery {
    /// Filter by project ID
    #[param(example = "a1b2c3d4")]
    pub project_id: Option<String>,
    /// Parent document ID, or `root` for top-level documents
    #[param(example = "root")]
    pub parent_id: Option<String>,
    /// Substring match on title or content
    #[param(example = "onboarding")]
    pub q: Option<String>,
    #[param(example = 20)]
    pub limit: Option<usize>,
    #[param(example = 0)]
    pub offset: Option<usize>,
    /// Field to sort by (title, idx, created_at, updated_at)
    #[param(example = "title")]
    pub sort: Option<String>,
    /// Sort order (asc, desc)
    #[param(example = "asc")]
    pub order: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DocumentTreeQuery {
    /// Restrict the tree to one project
    #[param(example = "a1b2c3d4")]
    pub project_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedDocuments {
    pub items: Vec<DocumentResponse>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

// =============================================================================
// Helpers
// =============================================================================

fn document_title(title: &str) -> HandlerResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(bad_request("Document title must not be empty"));
    }
    Ok(title.to_string())
}

/// Mentions in `content` that name current members of the team.
async fn member_mentions<D: Database>(db: &D, team_id: &str, content: &str) -> HandlerResult<Vec<String>> {
    let mentioned = extract_mentions(content);
    if mentioned.is_empty() {
        return Ok(mentioned);
    }

    let members: HashSet<String> = db
        .teams()
        .list_members(team_id)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(|m| m.user.id)
        .collect();

    Ok(mentioned
        .into_iter()
        .filter(|id| members.contains(id))
        .collect())
}

// =============================================================================
// Handlers
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/v1/documents",
    tag = "documents",
    params(ListDocumentsQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Paginated list of documents", body = PaginatedDocuments)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn list_documents<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Query(query): Query<ListDocumentsQuery>,
) -> HandlerResult<Json<PaginatedDocuments>> {
    let parent = match non_blank(query.parent_id.clone()) {
        None => None,
        Some(p) if p == "root" => Some(ParentFilter::Root),
        Some(p) => Some(ParentFilter::Parent(p)),
    };

    let db_query = DocumentQuery {
        page: PageSort {
            limit: query.limit,
            offset: query.offset,
            sort_by: query.sort.clone(),
            sort_order: parse_order(query.order.as_deref()),
        },
        project_id: non_blank(query.project_id.clone()),
        parent,
        search: non_blank(query.q.clone()),
    };

    let result = state
        .db()
        .documents()
        .list(&scope.team_id, Some(&db_query))
        .await
        .map_err(db_error)?;

    Ok(Json(PaginatedDocuments {
        items: result.items.into_iter().map(DocumentResponse::from).collect(),
        total: result.total,
        limit: result.limit.unwrap_or(result.total),
        offset: result.offset,
    }))
}

/// Page tree
///
/// All documents of the team (or one project) nested under their parents.
#[utoipa::path(
    get,
    path = "/api/v1/documents/tree",
    tag = "documents",
    params(DocumentTreeQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Nested page tree", body = Vec<DocumentNode>)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn document_tree<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Query(query): Query<DocumentTreeQuery>,
) -> HandlerResult<Json<Vec<DocumentNode>>> {
    let project_id = non_blank(query.project_id);
    let documents = state
        .db()
        .documents()
        .list_all(&scope.team_id, project_id.as_deref())
        .await
        .map_err(db_error)?;

    Ok(Json(build_tree(&documents)))
}

#[utoipa::path(
    post,
    path = "/api/v1/documents",
    tag = "documents",
    request_body = CreateDocumentRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Document created", body = DocumentResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Parent or project not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope, req), fields(team_id = %scope.team_id))]
pub async fn create_document<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    JsonBody(req): JsonBody<CreateDocumentRequest>,
) -> HandlerResult<(StatusCode, Json<DocumentResponse>)> {
    let parent_id = non_blank(req.parent_id);
    if let Some(parent_id) = &parent_id {
        state
            .db()
            .documents()
            .get(&scope.team_id, parent_id)
            .await
            .map_err(db_error)?;
    }
    let project_id = non_blank(req.project_id);
    if let Some(project_id) = &project_id {
        state
            .db()
            .projects()
            .get(&scope.team_id, project_id)
            .await
            .map_err(db_error)?;
    }

    let mentions = member_mentions(state.db(), &scope.team_id, &req.content).await?;
    let document = Document {
        id: String::new(),
        team_id: scope.team_id.clone(),
        project_id,
        parent_id,
        title: document_title(&req.title)?,
        content: req.content,
        icon: non_blank(req.icon),
        idx: req.idx,
        version: 1,
        created_by: Some(scope.user.id.clone()),
        updated_by: Some(scope.user.id.clone()),
        mentions,
        created_at: String::new(),
        updated_at: String::new(),
    };

    let created = state
        .db()
        .documents()
        .create(&document)
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::DocumentCreated {
            document_id: created.id.clone(),
        },
    );

    Ok((StatusCode::CREATED, Json(DocumentResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}",
    tag = "documents",
    params(("id" = String, Path, description = "Document ID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Document found", body = DocumentResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn get_document<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
) -> HandlerResult<Json<DocumentResponse>> {
    let document = state
        .db()
        .documents()
        .get(&scope.team_id, &id)
        .await
        .map_err(db_error)?;
    Ok(Json(DocumentResponse::from(document)))
}

#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}/children",
    tag = "documents",
    params(("id" = String, Path, description = "Document ID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Direct children in sibling order", body = Vec<DocumentResponse>),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn list_children<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
) -> HandlerResult<Json<Vec<DocumentResponse>>> {
    state
        .db()
        .documents()
        .get(&scope.team_id, &id)
        .await
        .map_err(db_error)?;

    let query = DocumentQuery {
        parent: Some(ParentFilter::Parent(id)),
        ..Default::default()
    };
    let mut children = state
        .db()
        .documents()
        .list(&scope.team_id, Some(&query))
        .await
        .map_err(db_error)?
        .items;

    // Same order as the page tree: idx (missing last), title, id
    children.sort_by(|a, b| {
        (a.idx.is_none(), a.idx, &a.title, &a.id).cmp(&(b.idx.is_none(), b.idx, &b.title, &b.id))
    });

    Ok(Json(
        children.into_iter().map(DocumentResponse::from).collect(),
    ))
}

/// Autosave
///
/// Saves whatever fields are present and bumps the version. Without
/// `expected_version` the last write wins.
#[utoipa::path(
    patch,
    path = "/api/v1/documents/{id}",
    tag = "documents",
    params(("id" = String, Path, description = "Document ID")),
    request_body = PatchDocumentRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Document saved", body = DocumentResponse),
        (status = 404, description = "Document or project not found", body = ErrorResponse),
        (status = 409, description = "Stored version differs from expected_version", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope, req), fields(team_id = %scope.team_id))]
pub async fn patch_document<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<PatchDocumentRequest>,
) -> HandlerResult<Json<DocumentResponse>> {
    let mut document = state
        .db()
        .documents()
        .get(&scope.team_id, &id)
        .await
        .map_err(db_error)?;

    let expected_version = req.expected_version;
    req.merge_into(&mut document)?;

    if let Some(project_id) = &document.project_id {
        state
            .db()
            .projects()
            .get(&scope.team_id, project_id)
            .await
            .map_err(db_error)?;
    }

    document.mentions = member_mentions(state.db(), &scope.team_id, &document.content).await?;
    document.updated_by = Some(scope.user.id.clone());

    let saved = state
        .db()
        .documents()
        .update(&document, expected_version)
        .await
        .map_err(db_error)?;
    debug!(document_id = %saved.id, version = saved.version, "document saved");

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::DocumentUpdated {
            document_id: saved.id.clone(),
            version: saved.version,
        },
    );

    Ok(Json(DocumentResponse::from(saved)))
}

/// Move a document
///
/// Re-parents and/or reorders a document. Moving a page under itself or
/// one of its descendants is rejected.
#[utoipa::path(
    post,
    path = "/api/v1/documents/{id}/move",
    tag = "documents",
    params(("id" = String, Path, description = "Document ID")),
    request_body = MoveDocumentRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Document moved", body = DocumentResponse),
        (status = 404, description = "Document or parent not found", body = ErrorResponse),
        (status = 409, description = "Move would create a cycle", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn move_document<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<MoveDocumentRequest>,
) -> HandlerResult<Json<DocumentResponse>> {
    let documents = state.db().documents();
    documents
        .get(&scope.team_id, &id)
        .await
        .map_err(db_error)?;

    let parent_id = non_blank(req.parent_id);
    if let Some(parent_id) = &parent_id {
        documents
            .get(&scope.team_id, parent_id)
            .await
            .map_err(db_error)?;

        let all = documents
            .list_all(&scope.team_id, None)
            .await
            .map_err(db_error)?;
        if would_create_cycle(&all, &id, parent_id) {
            return Err(error_reply(
                StatusCode::CONFLICT,
                format!("Cannot move '{}' under its own descendant '{}'", id, parent_id),
            ));
        }
    }

    let moved = documents
        .set_parent(
            &scope.team_id,
            &id,
            parent_id.as_deref(),
            req.idx,
            &scope.user.id,
        )
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::DocumentMoved {
            document_id: moved.id.clone(),
            parent_id: moved.parent_id.clone(),
        },
    );

    Ok(Json(DocumentResponse::from(moved)))
}

/// Delete a document and its subtree
#[utoipa::path(
    delete,
    path = "/api/v1/documents/{id}",
    tag = "documents",
    params(("id" = String, Path, description = "Document ID")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Document and descendants deleted"),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn delete_document<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
) -> HandlerResult<StatusCode> {
    state
        .db()
        .documents()
        .delete(&scope.team_id, &id)
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::DocumentDeleted {
            document_id: id.clone(),
        },
    );

    Ok(StatusCode::NO_CONTENT)
}
