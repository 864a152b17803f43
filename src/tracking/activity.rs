use chrono::NaiveDateTime;

use crate::db::utils::parse_timestamp;
use crate::db::{DbResult, TimeEntry};

/// Outcome of a heartbeat against a running entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    /// New value for `last_activity_at` (never moves backwards).
    pub last_activity_at: NaiveDateTime,
    /// Seconds to add to the entry's idle total.
    pub idle_seconds_to_add: i64,
}

/// Idle seconds for a gap between two activity timestamps.
///
/// A gap longer than `threshold_secs` counts as idle in full; anything
/// shorter (or negative) counts as active.
pub fn idle_gap_seconds(last: NaiveDateTime, now: NaiveDateTime, threshold_secs: i64) -> i64 {
    let gap = (now - last).num_seconds();
    if gap > threshold_secs { gap } else { 0 }
}

/// Apply a heartbeat received at `now` to a running entry.
pub fn apply_heartbeat(
    entry: &TimeEntry,
    now: NaiveDateTime,
    idle_threshold_secs: i64,
) -> DbResult<Heartbeat> {
    let last = parse_timestamp(&entry.last_activity_at)?;
    Ok(Heartbeat {
        last_activity_at: last.max(now),
        idle_seconds_to_add: idle_gap_seconds(last, now, idle_threshold_secs),
    })
}

/// Worked seconds: wall time from start to end (or `now`) minus idle time.
pub fn tracked_seconds(entry: &TimeEntry, now: NaiveDateTime) -> DbResult<i64> {
    let started = parse_timestamp(&entry.started_at)?;
    let ended = match &entry.ended_at {
        Some(ended_at) => parse_timestamp(ended_at)?,
        None => now,
    };
    Ok(((ended - started).num_seconds() - entry.idle_seconds).max(0))
}
