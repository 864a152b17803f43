use serde::{Deserialize, Serialize};
use tabled::{Table, Tabled};

use crate::cli::api_client::ApiClient;
use crate::cli::error::CliResult;
use crate::cli::utils::{apply_table_style, format_duration, or_dash};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimeEntry {
    pub id: String,
    pub project_id: Option<String>,
    pub description: Option<String>,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub idle_seconds: i64,
    pub tracked_seconds: i64,
    pub running: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectTotal {
    pub project: String,
    pub seconds: i64,
    pub entries: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DayTotal {
    pub day: String,
    pub seconds: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TimeSummary {
    pub total_seconds: i64,
    pub idle_seconds: i64,
    pub entry_count: usize,
    pub by_project: Vec<ProjectTotal>,
    pub by_day: Vec<DayTotal>,
}

#[derive(Debug, Serialize)]
struct StartTimerRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "Entries")]
    entries: usize,
    #[tabled(rename = "Tracked")]
    tracked: String,
}

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Day")]
    day: String,
    #[tabled(rename = "Tracked")]
    tracked: String,
}

fn describe(entry: &TimeEntry) -> String {
    format!(
        "{} [{}] project: {}, tracked {} (idle {})",
        or_dash(entry.description.as_deref()),
        entry.id,
        or_dash(entry.project_id.as_deref()),
        format_duration(entry.tracked_seconds),
        format_duration(entry.idle_seconds)
    )
}

/// Start a timer for the current user
pub async fn start(
    api_client: &ApiClient,
    project: Option<&str>,
    description: Option<&str>,
) -> CliResult<String> {
    let body = StartTimerRequest {
        project_id: project,
        description,
    };
    let response = api_client.post("/api/v1/time/start")?.json(&body).send().await?;
    let entry: TimeEntry = ApiClient::handle_response(response).await?;
    Ok(format!("✓ Started {}", describe(&entry)))
}

/// Stop the running timer
pub async fn stop(api_client: &ApiClient) -> CliResult<String> {
    let response = api_client.post("/api/v1/time/stop")?.send().await?;
    let entry: TimeEntry = ApiClient::handle_response(response).await?;
    Ok(format!("✓ Stopped {}", describe(&entry)))
}

/// Totals per project and per day
pub async fn report(
    api_client: &ApiClient,
    from: Option<&str>,
    to: Option<&str>,
    format: &str,
) -> CliResult<String> {
    let mut request = api_client.get("/api/v1/time/summary")?;
    if let Some(f) = from {
        request = request.query(&[("from", f)]);
    }
    if let Some(t) = to {
        request = request.query(&[("to", t)]);
    }

    let summary: TimeSummary = ApiClient::handle_response(request.send().await?).await?;

    match format {
        "json" => Ok(serde_json::to_string_pretty(&summary)?),
        _ => Ok(format_report(&summary)),
    }
}

pub(crate) fn format_report(summary: &TimeSummary) -> String {
    if summary.entry_count == 0 {
        return "No time entries found.".to_string();
    }

    let projects: Vec<ProjectRow> = summary
        .by_project
        .iter()
        .map(|p| ProjectRow {
            project: p.project.clone(),
            entries: p.entries,
            tracked: format_duration(p.seconds),
        })
        .collect();
    let mut project_table = Table::new(projects);
    apply_table_style(&mut project_table);

    let days: Vec<DayRow> = summary
        .by_day
        .iter()
        .map(|d| DayRow {
            day: d.day.clone(),
            tracked: format_duration(d.seconds),
        })
        .collect();
    let mut day_table = Table::new(days);
    apply_table_style(&mut day_table);

    format!(
        "Total: {} across {} entries (idle {})\n\n{}\n\n{}",
        format_duration(summary.total_seconds),
        summary.entry_count,
        format_duration(summary.idle_seconds),
        project_table,
        day_table
    )
}
