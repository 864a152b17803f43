//! Aggregation of time entries into per-project and per-day totals.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::activity::tracked_seconds;
use crate::db::utils::parse_timestamp;
use crate::db::{DbResult, TimeEntry};

/// Bucket name for entries without a project.
pub const UNASSIGNED: &str = "unassigned";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProjectTotal {
    /// Project id, or `"unassigned"`
    #[schema(example = "a1b2c3d4")]
    pub project: String,
    pub seconds: i64,
    pub entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DayTotal {
    /// UTC date the entries started on
    #[schema(example = "2025-03-01")]
    pub day: String,
    pub seconds: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimeSummary {
    pub total_seconds: i64,
    pub idle_seconds: i64,
    pub entry_count: usize,
    pub by_project: Vec<ProjectTotal>,
    pub by_day: Vec<DayTotal>,
}

/// Summarize entries. Running entries count up to `now`.
///
/// Projects are listed by descending time (ties by id), days ascending.
pub fn summarize(entries: &[TimeEntry], now: NaiveDateTime) -> DbResult<TimeSummary> {
    let mut summary = TimeSummary::default();
    let mut projects: BTreeMap<String, (i64, usize)> = BTreeMap::new();
    let mut days: BTreeMap<String, i64> = BTreeMap::new();

    for entry in entries {
        let seconds = tracked_seconds(entry, now)?;
        let day = parse_timestamp(&entry.started_at)?
            .date()
            .format("%Y-%m-%d")
            .to_string();

        summary.total_seconds += seconds;
        summary.idle_seconds += entry.idle_seconds;
        summary.entry_count += 1;

        let key = entry
            .project_id
            .clone()
            .unwrap_or_else(|| UNASSIGNED.to_string());
        let bucket = projects.entry(key).or_default();
        bucket.0 += seconds;
        bucket.1 += 1;

        *days.entry(day).or_default() += seconds;
    }

    summary.by_project = projects
        .into_iter()
        .map(|(project, (seconds, entries))| ProjectTotal {
            project,
            seconds,
            entries,
        })
        .collect();
    summary
        .by_project
        .sort_by(|a, b| b.seconds.cmp(&a.seconds).then_with(|| a.project.cmp(&b.project)));

    summary.by_day = days
        .into_iter()
        .map(|(day, seconds)| DayTotal { day, seconds })
        .collect();

    Ok(summary)
}
