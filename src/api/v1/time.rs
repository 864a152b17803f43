//! Time tracking handlers: timer control, heartbeats, listings and summaries.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use utoipa::{IntoParams, ToSchema};

use super::screenshots::run_store;
use super::{
    ErrorReply, ErrorResponse, HandlerResult, bad_request, db_error, error_reply, forbidden,
    non_blank, parse_order,
};
use crate::api::notifier::UpdateMessage;
use crate::api::{AppState, JsonBody, TeamScope};
use crate::db::utils::{TIMESTAMP_FORMAT, format_timestamp};
use crate::db::{
    Database, DbError, PageSort, ScreenshotRepository, TimeEntry, TimeEntryQuery,
    TimeEntryRepository,
};
use crate::storage::{ImageType, ScreenshotStore};
use crate::tracking::{TimeSummary, apply_heartbeat, summarize, tracked_seconds};

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TimeEntryResponse {
    #[schema(example = "a1b2c3d4")]
    pub id: String,
    pub user_id: String,
    pub project_id: Option<String>,
    pub description: Option<String>,
    #[schema(example = "2025-03-01 09:00:00")]
    pub started_at: String,
    pub ended_at: Option<String>,
    pub last_activity_at: String,
    pub idle_seconds: i64,
    /// Worked time so far (wall time minus idle time)
    pub tracked_seconds: i64,
    pub running: bool,
    pub created_at: String,
}

impl TimeEntryResponse {
    fn at(entry: TimeEntry, now: NaiveDateTime) -> HandlerResult<Self> {
        let tracked = tracked_seconds(&entry, now).map_err(db_error)?;
        Ok(Self {
            running: entry.is_running(),
            tracked_seconds: tracked,
            id: entry.id,
            user_id: entry.user_id,
            project_id: entry.project_id,
            description: entry.description,
            started_at: entry.started_at,
            ended_at: entry.ended_at,
            last_activity_at: entry.last_activity_at,
            idle_seconds: entry.idle_seconds,
            created_at: entry.created_at,
        })
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StartTimerRequest {
    pub project_id: Option<String>,
    #[schema(example = "Writing the onboarding guide")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListEntriesQuery {
    /// Entries of this user (admins only for other users)
    pub user_id: Option<String>,
    pub project_id: Option<String>,
    /// Started at or after (`YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`)
    #[param(example = "2025-03-01")]
    pub from: Option<String>,
    /// Started before (`YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`)
    #[param(example = "2025-04-01")]
    pub to: Option<String>,
    #[param(example = 20)]
    pub limit: Option<usize>,
    #[param(example = 0)]
    pub offset: Option<usize>,
    /// Field to sort by (started_at, ended_at, created_at)
    #[param(example = "started_at")]
    pub sort: Option<String>,
    /// Sort order (asc, desc; default desc)
    #[param(example = "desc")]
    pub order: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SummaryQuery {
    pub user_id: Option<String>,
    #[param(example = "2025-03-01")]
    pub from: Option<String>,
    #[param(example = "2025-04-01")]
    pub to: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedTimeEntries {
    pub items: Vec<TimeEntryResponse>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

// =============================================================================
// Helpers
// =============================================================================

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Parse a range bound given as a date or a full timestamp.
pub(crate) fn parse_bound(value: Option<String>) -> HandlerResult<Option<String>> {
    let Some(value) = non_blank(value) else {
        return Ok(None);
    };
    if let Ok(ts) = NaiveDateTime::parse_from_str(&value, TIMESTAMP_FORMAT) {
        return Ok(Some(format_timestamp(ts)));
    }
    match NaiveDate::parse_from_str(&value, "%Y-%m-%d") {
        Ok(day) => Ok(Some(format_timestamp(day.and_time(chrono::NaiveTime::MIN)))),
        Err(_) => Err(bad_request(format!(
            "Invalid date '{}': use YYYY-MM-DD or YYYY-MM-DD HH:MM:SS",
            value
        ))),
    }
}

/// Members see their own entries; admins see everyone's.
pub(crate) fn ensure_visible(scope: &TeamScope, owner_id: &str) -> HandlerResult<()> {
    if scope.user.id == owner_id || scope.is_admin() {
        Ok(())
    } else {
        Err(forbidden("Only admins can access other members' time entries"))
    }
}

/// The user filter a caller is allowed to apply.
fn visible_user(scope: &TeamScope, requested: Option<String>) -> HandlerResult<Option<String>> {
    match non_blank(requested) {
        Some(user_id) => {
            ensure_visible(scope, &user_id)?;
            Ok(Some(user_id))
        }
        None if scope.is_admin() => Ok(None),
        None => Ok(Some(scope.user.id.clone())),
    }
}

async fn running_entry<D: Database, S: ScreenshotStore + Send + Sync>(
    state: &AppState<D, S>,
    scope: &TeamScope,
) -> HandlerResult<TimeEntry> {
    state
        .db()
        .time_entries()
        .get_running(&scope.team_id, &scope.user.id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| error_reply(StatusCode::NOT_FOUND, "No running time entry"))
}

/// The entry can be stopped (e.g. by the reaper) after it was looked up;
/// report that the same way as having no running entry.
pub(crate) fn stopped_as_not_found(e: DbError) -> ErrorReply {
    match e {
        DbError::Conflict { .. } => error_reply(StatusCode::NOT_FOUND, "No running time entry"),
        other => db_error(other),
    }
}

// =============================================================================
// Handlers
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/v1/time/start",
    tag = "time",
    request_body = StartTimerRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Timer started", body = TimeEntryResponse),
        (status = 400, description = "Unknown project", body = ErrorResponse),
        (status = 409, description = "A timer is already running", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id, user_id = %scope.user.id))]
pub async fn start_timer<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    JsonBody(req): JsonBody<StartTimerRequest>,
) -> HandlerResult<(StatusCode, Json<TimeEntryResponse>)> {
    let now = now();
    let entry = TimeEntry {
        id: String::new(),
        team_id: scope.team_id.clone(),
        user_id: scope.user.id.clone(),
        project_id: non_blank(req.project_id),
        description: non_blank(req.description),
        started_at: format_timestamp(now),
        ended_at: None,
        last_activity_at: String::new(),
        idle_seconds: 0,
        created_at: String::new(),
    };

    let started = state
        .db()
        .time_entries()
        .start(&entry)
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::TimeEntryStarted {
            time_entry_id: started.id.clone(),
            user_id: started.user_id.clone(),
        },
    );

    Ok((StatusCode::CREATED, Json(TimeEntryResponse::at(started, now)?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/time/stop",
    tag = "time",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Timer stopped", body = TimeEntryResponse),
        (status = 404, description = "No running time entry", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id, user_id = %scope.user.id))]
pub async fn stop_timer<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
) -> HandlerResult<Json<TimeEntryResponse>> {
    let running = running_entry(&state, &scope).await?;
    let now = now();

    let stopped = state
        .db()
        .time_entries()
        .stop(&scope.team_id, &running.id, &format_timestamp(now))
        .await
        .map_err(db_error)?;

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::TimeEntryStopped {
            time_entry_id: stopped.id.clone(),
            user_id: stopped.user_id.clone(),
        },
    );

    Ok(Json(TimeEntryResponse::at(stopped, now)?))
}

#[utoipa::path(
    get,
    path = "/api/v1/time/current",
    tag = "time",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The caller's running entry", body = TimeEntryResponse),
        (status = 404, description = "No running time entry", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id, user_id = %scope.user.id))]
pub async fn current_timer<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
) -> HandlerResult<Json<TimeEntryResponse>> {
    let running = running_entry(&state, &scope).await?;
    Ok(Json(TimeEntryResponse::at(running, now())?))
}

/// Activity heartbeat
///
/// Marks the caller as active. A gap since the previous activity longer
/// than the idle threshold is added to the entry's idle time.
#[utoipa::path(
    post,
    path = "/api/v1/time/heartbeat",
    tag = "time",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Activity recorded", body = TimeEntryResponse),
        (status = 404, description = "No running time entry", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id, user_id = %scope.user.id))]
pub async fn heartbeat<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
) -> HandlerResult<Json<TimeEntryResponse>> {
    let running = running_entry(&state, &scope).await?;
    let now = now();

    let beat = apply_heartbeat(&running, now, state.config().idle_threshold_secs)
        .map_err(db_error)?;
    if beat.idle_seconds_to_add > 0 {
        debug!(idle = beat.idle_seconds_to_add, "idle gap recorded");
    }

    let updated = state
        .db()
        .time_entries()
        .record_activity(
            &scope.team_id,
            &running.id,
            &format_timestamp(beat.last_activity_at),
            beat.idle_seconds_to_add,
        )
        .await
        .map_err(stopped_as_not_found)?;

    Ok(Json(TimeEntryResponse::at(updated, now)?))
}

#[utoipa::path(
    get,
    path = "/api/v1/time/entries",
    tag = "time",
    params(ListEntriesQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Paginated time entries, newest first", body = PaginatedTimeEntries),
        (status = 403, description = "Members may only list their own entries", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn list_entries<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Query(query): Query<ListEntriesQuery>,
) -> HandlerResult<Json<PaginatedTimeEntries>> {
    let db_query = TimeEntryQuery {
        page: PageSort {
            limit: query.limit,
            offset: query.offset,
            sort_by: query.sort.clone(),
            sort_order: parse_order(query.order.as_deref()),
        },
        user_id: visible_user(&scope, query.user_id.clone())?,
        project_id: non_blank(query.project_id.clone()),
        from: parse_bound(query.from.clone())?,
        to: parse_bound(query.to.clone())?,
    };

    let result = state
        .db()
        .time_entries()
        .list(&scope.team_id, Some(&db_query))
        .await
        .map_err(db_error)?;

    let now = now();
    let items = result
        .items
        .into_iter()
        .map(|entry| TimeEntryResponse::at(entry, now))
        .collect::<HandlerResult<Vec<_>>>()?;

    Ok(Json(PaginatedTimeEntries {
        items,
        total: result.total,
        limit: result.limit.unwrap_or(result.total),
        offset: result.offset,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/time/summary",
    tag = "time",
    params(SummaryQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Totals per project and per day", body = TimeSummary),
        (status = 403, description = "Members may only summarize their own entries", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn time_summary<D: Database, S: ScreenshotStore + Send + Sync>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Query(query): Query<SummaryQuery>,
) -> HandlerResult<Json<TimeSummary>> {
    let db_query = TimeEntryQuery {
        user_id: visible_user(&scope, query.user_id.clone())?,
        from: parse_bound(query.from.clone())?,
        to: parse_bound(query.to.clone())?,
        ..Default::default()
    };

    let entries = state
        .db()
        .time_entries()
        .list(&scope.team_id, Some(&db_query))
        .await
        .map_err(db_error)?
        .items;

    let summary = summarize(&entries, now()).map_err(db_error)?;
    Ok(Json(summary))
}

/// Delete a time entry and its screenshots
#[utoipa::path(
    delete,
    path = "/api/v1/time/entries/{id}",
    tag = "time",
    params(("id" = String, Path, description = "Time entry ID")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 403, description = "Not your entry", body = ErrorResponse),
        (status = 404, description = "Entry not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, scope), fields(team_id = %scope.team_id))]
pub async fn delete_entry<D: Database + 'static, S: ScreenshotStore + Send + Sync + 'static>(
    State(state): State<AppState<D, S>>,
    scope: TeamScope,
    Path(id): Path<String>,
) -> HandlerResult<StatusCode> {
    let entry = state
        .db()
        .time_entries()
        .get(&scope.team_id, &id)
        .await
        .map_err(db_error)?;
    ensure_visible(&scope, &entry.user_id)?;

    let screenshots = state
        .db()
        .screenshots()
        .list_for_entry(&scope.team_id, &id)
        .await
        .map_err(db_error)?;

    // Metadata goes with the entry through the cascade
    state
        .db()
        .time_entries()
        .delete(&scope.team_id, &id)
        .await
        .map_err(db_error)?;

    for shot in screenshots {
        let Some(image) = ImageType::from_content_type(&shot.content_type) else {
            warn!(screenshot_id = %shot.id, content_type = %shot.content_type, "unknown stored content type");
            continue;
        };
        let team_id = scope.team_id.clone();
        if let Err(e) = run_store(state.store(), move |store| {
            store.delete(&team_id, &shot.id, image)
        })
        .await
        {
            warn!("failed to remove screenshot blob: {}", e.1.error);
        }
    }

    state.notifier().notify(
        &scope.team_id,
        UpdateMessage::TimeEntryDeleted {
            time_entry_id: id.clone(),
        },
    );

    Ok(StatusCode::NO_CONTENT)
}
