//! Database utility functions.

use chrono::{Duration, NaiveDateTime, Utc};

use crate::db::{DbError, DbResult};

/// Storage format for every timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Generate an 8-character hex ID for database entities
pub fn generate_entity_id() -> String {
    format!("{:08x}", rand::random::<u32>())
}

/// Get current datetime as string in SQLite format
pub fn current_timestamp() -> String {
    format_timestamp(Utc::now().naive_utc())
}

/// Format a UTC datetime in SQLite format.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp.
pub fn parse_timestamp(s: &str) -> DbResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map_err(|e| DbError::InvalidData {
        message: format!("Invalid timestamp '{}': {}", s, e),
        help: "Timestamps use the format YYYY-MM-DD HH:MM:SS".to_string(),
    })
}

/// Timestamp `offset` away from now, for expiry and cutoff calculations.
pub fn timestamp_from_now(offset: Duration) -> String {
    format_timestamp(Utc::now().naive_utc() + offset)
}

//
// TIMESTAMP HANDLING POLICY
//
// Repositories always generate created_at/updated_at themselves; input
// timestamps on create() are ignored. Time-tracking columns (started_at,
// ended_at, last_activity_at) are supplied by the caller so that the
// activity arithmetic in `crate::tracking` can run against an explicit `now`.
//
