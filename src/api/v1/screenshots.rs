//! Screenshot upload and retrieval handlers.
//!
//! Metadata is stored through the database, image bytes through the
//! [`ScreenshotStore`]. Store calls are blocking and run on the blocking
//! thread pool.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use super::time::ensure_visible;
use super::{ErrorReply, ErrorResponse, HandlerResult, db_error, error_reply, internal};
use crate::api::notifier::UpdateMessage;
use crate::api::{AppState, ImageBody, TeamScope};
use crate::db::utils::generate_entity_id;
use crate::db::{Database, Screenshot, ScreenshotRepository, TimeEntryRepository};
use crate::storage::{ImageType, ScreenshotStore, StoreError, detect_image_type};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScreenshotResponse {
    #[schema(example = "a1b2c3d4")]
    pub id: String,
    pub time_entry_id: String,
    pub user_id: String,
    #[schema(example = "image/png")]
    pub content_type: String,
    pub byte_size: i64,
    #[schema(example = "2025-03-01 09:15:00")]
    pub captured_at: String,
    pub created_at: String,
}

impl From<Screenshot> for ScreenshotResponse {
    fn from(s: Screenshot) -> Self {
        Self {
            id: s.id,
            time_entry_id: s.time_entry_id,
            user_id: s.user_id,
            content_type: s.content_type,
            byte_size: s.byte_size,
            captured_at: s.captured_at,
            created_at: s.created_at,
        }
    }
}

pub(crate) fn store_error(e: StoreError) -> ErrorReply {
    match e {
        StoreError::NotFound(_) => error_reply(StatusCode::NOT_FOUND, e.to_string()),
        StoreError::UnsupportedType => {
            error_reply(StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string())
        }
        StoreError::InvalidKey(_) => error_reply(StatusCode::BAD_REQUEST, e.to_string()),
        StoreError::Io(_) => internal(e),
    }
}

/// Run a blocking store operation off the async runtime.
pub(crate) async fn run_store<S, T, F>(store: Arc<S>, op: F) -> HandlerResult<T>
where
    S: ScreenshotStore + Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&S) -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(internal)?
        .map_err(store_error)
}

fn image_type_of(shot: &Screenshot) -> HandlerResult<ImageType> {
    ImageType::from_content_type(&shot.content_type).ok_or_else(|| {
        internal(format!(
            "Screenshot '{}' has unknown content type '{}'",
            shot.id, shot.content_type
        ))
    })
}

/// Upload a screenshot
///
/// Raw PNG, JPEG or WebP bytes for the caller's running time entry.
#[utoipa::path(
    post,
    path = "/api/v1/time/entries/{id}/screenshots",
    tag = "screenshots",
    params(("id" = String, Path, description = "Time entry ID")),
    request_body(content = Vec<u8>, content_type = "image/png"),
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Screenshot stored", body = ScreenshotResponse),
        (status = 403, description = "Not your time entry", body = ErrorResponse),
        (status = 404, description = "Time entry not found", body = ErrorResponse),
        (status = 409, description = "Time entry is not running", body = ErrorResponse),
        (status = 413, description = "Image too large", body = ErrorResponse),
        (status = 415, description = "Not a PNG, JPEG or WebP image", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope, image_body), fields(team_id = %scope.team_id, bytes = image_body.0.len()))]
pub async fn upload_screenshot<D: Database + 'static, S: ScreenshotStore + Send + Sync + 'static>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(entry_id): Path<String>,
    image_body: ImageBody,
) -> HandlerResult<(StatusCode, Json<ScreenshotResponse>)> {
    let ImageBody(body) = image_body;
    let image = detect_image_type(&body).ok_or_else(|| store_error(StoreError::UnsupportedType))?;

    let entry = state
        .db()
        .time_entries()
        .get(&scope.team_id, &entry_id)
        .await
        .map_err(db_error)?;
    if entry.user_id != scope.user.id {
        return Err(error_reply(
            StatusCode::FORBIDDEN,
            "Screenshots can only be added to your own time entry",
        ));
    }
    if !entry.is_running() {
        return Err(error_reply(
            StatusCode::CONFLICT,
            format!("Time entry '{}' is not running", entry_id),
        ));
    }

    let id = generate_entity_id();
    let byte_size = body.len() as i64;
    {
        let (team_id, id) = (scope.team_id.clone(), id.clone());
        run_store(state.store(), move |store| store.put(&team_id, &id, image, &body)).await?;
    }

    let shot = Screenshot {
        id: id.clone(),
        team_id: scope.team_id.clone(),
        time_entry_id: entry_id,
        user_id: scope.user.id.clone(),
        content_type: image.content_type().to_string(),
        byte_size,
        captured_at: String::new(),
        created_at: String::new(),
    };
    let created = match state.db().screenshots().create(&shot).await {
        Ok(created) => created,
        Err(e) => {
            // Do not leave an orphaned blob behind
            let team_id = scope.team_id.clone();
            if let Err(cleanup) =
                run_store(state.store(), move |store| store.delete(&team_id, &id, image)).await
            {
                warn!("failed to remove orphaned screenshot: {}", cleanup.1.error);
            }
            return Err(db_error(e));
        }
    };
    info!(screenshot_id = %created.id, "screenshot stored");

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::ScreenshotCaptured {
            screenshot_id: created.id.clone(),
            time_entry_id: created.time_entry_id.clone(),
        },
    );

    Ok((StatusCode::CREATED, Json(ScreenshotResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/time/entries/{id}/screenshots",
    tag = "screenshots",
    params(("id" = String, Path, description = "Time entry ID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Screenshots in capture order", body = Vec<ScreenshotResponse>),
        (status = 403, description = "Not your time entry", body = ErrorResponse),
        (status = 404, description = "Time entry not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn list_screenshots<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(entry_id): Path<String>,
) -> HandlerResult<Json<Vec<ScreenshotResponse>>> {
    let entry = state
        .db()
        .time_entries()
        .get(&scope.team_id, &entry_id)
        .await
        .map_err(db_error)?;
    ensure_visible(&scope, &entry.user_id)?;

    let shots = state
        .db()
        .screenshots()
        .list_for_entry(&scope.team_id, &entry_id)
        .await
        .map_err(db_error)?;

    Ok(Json(
        shots.into_iter().map(ScreenshotResponse::from).collect(),
    ))
}

/// Download a screenshot
///
/// Returns the raw image with its content type.
#[utoipa::path(
    get,
    path = "/api/v1/screenshots/{id}",
    tag = "screenshots",
    params(("id" = String, Path, description = "Screenshot ID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Image bytes", content_type = "image/png", body = Vec<u8>),
        (status = 403, description = "Not your screenshot", body = ErrorResponse),
        (status = 404, description = "Screenshot not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn get_screenshot<D: Database + 'static, S: ScreenshotStore + Send + Sync + 'static>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
) -> HandlerResult<Response> {
    let shot = state
        .db()
        .screenshots()
        .get(&scope.team_id, &id)
        .await
        .map_err(db_error)?;
    ensure_visible(&scope, &shot.user_id)?;

    let image = image_type_of(&shot)?;
    let team_id = scope.team_id.clone();
    let bytes = run_store(state.store(), move |store| store.get(&team_id, &id, image)).await?;

    Ok(([(header::CONTENT_TYPE, image.content_type())], bytes).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/v1/screenshots/{id}",
    tag = "screenshots",
    params(("id" = String, Path, description = "Screenshot ID")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Screenshot deleted"),
        (status = 403, description = "Not your screenshot", body = ErrorResponse),
        (status = 404, description = "Screenshot not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn delete_screenshot<D: Database + 'static, S: ScreenshotStore + Send + Sync + 'static>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
) -> HandlerResult<StatusCode> {
    let shot = state
        .db()
        .screenshots()
        .get(&scope.team_id, &id)
        .await
        .map_err(db_error)?;
    ensure_visible(&scope, &shot.user_id)?;
    let image = image_type_of(&shot)?;

    state
        .db()
        .screenshots()
        .delete(&scope.team_id, &id)
        .await
        .map_err(db_error)?;

    let (team_id, blob_id) = (scope.team_id.clone(), id.clone());
    run_store(state.store(), move |store| store.delete(&team_id, &blob_id, image)).await?;

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::ScreenshotDeleted {
            screenshot_id: id.clone(),
        },
    );

    Ok(StatusCode::NO_CONTENT)
}
