//! V1 API handlers.

mod auth;
mod crm;
mod documents;
mod projects;
mod screenshots;
mod system;
mod teams;
mod time;
mod users;

#[cfg(test)]
mod documents_test;
#[cfg(test)]
mod system_test;
#[cfg(test)]
mod users_test;

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::db::{DbError, SortOrder, TeamRole};

pub use auth::*;
pub use crm::*;
pub use documents::*;
pub use projects::*;
pub use screenshots::*;
pub use system::*;
pub use teams::*;
pub use time::*;
pub use users::*;

/// Error response DTO
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    #[schema(example = "Document 'a1b2c3d4' not found")]
    pub error: String,
}

/// Rejection shared by handlers and extractors.
pub type ErrorReply = (StatusCode, Json<ErrorResponse>);

pub type HandlerResult<T> = Result<T, ErrorReply>;

pub(crate) fn error_reply(status: StatusCode, message: impl Into<String>) -> ErrorReply {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map a database error onto its HTTP status.
pub(crate) fn db_error(e: DbError) -> ErrorReply {
    match &e {
        DbError::NotFound { entity_type, id } => error_reply(
            StatusCode::NOT_FOUND,
            format!("{} '{}' not found", entity_type, id),
        ),
        DbError::AlreadyExists { .. } | DbError::Conflict { .. } => {
            error_reply(StatusCode::CONFLICT, e.to_string())
        }
        DbError::Validation { message } => error_reply(StatusCode::BAD_REQUEST, message.clone()),
        DbError::InvalidData { .. } | DbError::Constraint { .. } => {
            error_reply(StatusCode::BAD_REQUEST, e.to_string())
        }
        _ => {
            error!("database error: {}", e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub(crate) fn bad_request(message: impl Into<String>) -> ErrorReply {
    error_reply(StatusCode::BAD_REQUEST, message)
}

pub(crate) fn forbidden(message: impl Into<String>) -> ErrorReply {
    error_reply(StatusCode::FORBIDDEN, message)
}

pub(crate) fn internal(message: impl std::fmt::Display) -> ErrorReply {
    error!("internal error: {}", message);
    error_reply(StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
}

/// Fail with 403 unless `role` is at least `required`.
pub(crate) fn require_role(role: TeamRole, required: TeamRole) -> HandlerResult<()> {
    if role.at_least(required) {
        Ok(())
    } else {
        Err(forbidden(format!("Requires {} role", required)))
    }
}

pub(crate) fn parse_order(order: Option<&str>) -> Option<SortOrder> {
    match order {
        Some("desc") => Some(SortOrder::Desc),
        Some("asc") => Some(SortOrder::Asc),
        _ => None,
    }
}

/// Split a comma-separated query value, dropping blanks.
pub(crate) fn split_csv(value: Option<&str>) -> Option<Vec<String>> {
    value.map(|v| {
        v.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

/// Treat a blank string as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
