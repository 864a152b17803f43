//! SQLite TimeEntryRepository implementation.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::helpers::{build_limit_offset_clause, build_order_clause};
use crate::db::utils::{current_timestamp, generate_entity_id};
use crate::db::{
    DbError, DbResult, ListResult, SortOrder, TimeEntry, TimeEntryQuery, TimeEntryRepository,
};

const ENTRY_COLUMNS: &str = "t.id, t.team_id, t.user_id, t.project_id, t.description, \
     t.started_at, t.ended_at, t.last_activity_at, t.idle_seconds, t.created_at";

fn row_to_entry(row: &SqliteRow) -> TimeEntry {
    TimeEntry {
        id: row.get("id"),
        team_id: row.get("team_id"),
        user_id: row.get("user_id"),
        project_id: row.get("project_id"),
        description: row.get("description"),
        started_at: row.get("started_at"),
        ended_at: row.get("ended_at"),
        last_activity_at: row.get("last_activity_at"),
        idle_seconds: row.get("idle_seconds"),
        created_at: row.get("created_at"),
    }
}

/// SQLx-backed time entry repository.
pub struct SqliteTimeEntryRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

impl<'a> TimeEntryRepository for SqliteTimeEntryRepository<'a> {
    async fn start(&self, entry: &TimeEntry) -> DbResult<TimeEntry> {
        let id = if entry.id.is_empty() {
            generate_entity_id()
        } else {
            entry.id.clone()
        };
        let created_at = current_timestamp();
        let started_at = if entry.started_at.is_empty() {
            created_at.clone()
        } else {
            entry.started_at.clone()
        };

        if let Some(project_id) = &entry.project_id {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM project WHERE team_id = ? AND id = ?")
                    .bind(&entry.team_id)
                    .bind(project_id)
                    .fetch_one(self.pool)
                    .await?;
            if count == 0 {
                return Err(DbError::Validation {
                    message: format!("Unknown project '{}'", project_id),
                });
            }
        }

        // The partial unique index on running entries turns a second start into a Conflict
        sqlx::query(
            "INSERT INTO time_entry (id, team_id, user_id, project_id, description, started_at, \
             ended_at, last_activity_at, idle_seconds, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, NULL, ?, 0, ?)",
        )
        .bind(&id)
        .bind(&entry.team_id)
        .bind(&entry.user_id)
        .bind(&entry.project_id)
        .bind(&entry.description)
        .bind(&started_at)
        .bind(&started_at)
        .bind(&created_at)
        .execute(self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::Conflict { .. } => DbError::Conflict {
                message: "A timer is already running".to_string(),
            },
            other => other,
        })?;

        Ok(TimeEntry {
            id,
            team_id: entry.team_id.clone(),
            user_id: entry.user_id.clone(),
            project_id: entry.project_id.clone(),
            description: entry.description.clone(),
            started_at: started_at.clone(),
            ended_at: None,
            last_activity_at: started_at,
            idle_seconds: 0,
            created_at,
        })
    }

    async fn get(&self, team_id: &str, id: &str) -> DbResult<TimeEntry> {
        let sql = format!(
            "SELECT {} FROM time_entry t WHERE t.team_id = ? AND t.id = ?",
            ENTRY_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(team_id)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("TimeEntry", id))?;
        Ok(row_to_entry(&row))
    }

    async fn get_running(&self, team_id: &str, user_id: &str) -> DbResult<Option<TimeEntry>> {
        let sql = format!(
            "SELECT {} FROM time_entry t \
             WHERE t.team_id = ? AND t.user_id = ? AND t.ended_at IS NULL",
            ENTRY_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(team_id)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_entry))
    }

    async fn list(&self, team_id: &str, query: Option<&TimeEntryQuery>) -> DbResult<ListResult<TimeEntry>> {
        let default_query = TimeEntryQuery::default();
        let query = query.unwrap_or(&default_query);
        let allowed_fields = ["started_at", "ended_at", "created_at"];

        let order_clause =
            build_order_clause(&query.page, &allowed_fields, "started_at", SortOrder::Desc, "t.");
        let limit_clause = build_limit_offset_clause(&query.page);

        let mut conditions: Vec<String> = vec!["t.team_id = ?".to_string()];
        let mut bind_values: Vec<String> = vec![team_id.to_string()];

        if let Some(user_id) = &query.user_id {
            conditions.push("t.user_id = ?".to_string());
            bind_values.push(user_id.clone());
        }
        if let Some(project_id) = &query.project_id {
            conditions.push("t.project_id = ?".to_string());
            bind_values.push(project_id.clone());
        }
        if let Some(from) = &query.from {
            conditions.push("t.started_at >= ?".to_string());
            bind_values.push(from.clone());
        }
        if let Some(to) = &query.to {
            conditions.push("t.started_at < ?".to_string());
            bind_values.push(to.clone());
        }

        let where_clause = format!("WHERE {}", conditions.join(" AND "));
        let sql = format!(
            "SELECT {} FROM time_entry t {} {} {}",
            ENTRY_COLUMNS, where_clause, order_clause, limit_clause
        );
        let count_sql = format!("SELECT COUNT(*) FROM time_entry t {}", where_clause);

        let mut sql_query = sqlx::query(&sql);
        for value in &bind_values {
            sql_query = sql_query.bind(value);
        }
        let rows = sql_query.fetch_all(self.pool).await?;
        let items: Vec<TimeEntry> = rows.iter().map(row_to_entry).collect();

        let mut count_query = sqlx::query_scalar(&count_sql);
        for value in &bind_values {
            count_query = count_query.bind(value);
        }
        let total: i64 = count_query.fetch_one(self.pool).await?;

        Ok(ListResult {
            items,
            total: total as usize,
            limit: query.page.limit,
            offset: query.page.offset.unwrap_or(0),
        })
    }

    async fn record_activity(
        &self,
        team_id: &str,
        id: &str,
        last_activity_at: &str,
        idle_seconds_to_add: i64,
    ) -> DbResult<TimeEntry> {
        let result = sqlx::query(
            "UPDATE time_entry SET last_activity_at = ?, idle_seconds = idle_seconds + ? \
             WHERE team_id = ? AND id = ? AND ended_at IS NULL",
        )
        .bind(last_activity_at)
        .bind(idle_seconds_to_add.max(0))
        .bind(team_id)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either missing or already stopped
            let entry = self.get(team_id, id).await?;
            return Err(DbError::Conflict {
                message: format!("Time entry '{}' is not running", entry.id),
            });
        }

        self.get(team_id, id).await
    }

    async fn stop(&self, team_id: &str, id: &str, ended_at: &str) -> DbResult<TimeEntry> {
        let result = sqlx::query(
            "UPDATE time_entry SET ended_at = ? WHERE team_id = ? AND id = ? AND ended_at IS NULL",
        )
        .bind(ended_at)
        .bind(team_id)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let entry = self.get(team_id, id).await?;
            return Err(DbError::Conflict {
                message: format!("Time entry '{}' is already stopped", entry.id),
            });
        }

        self.get(team_id, id).await
    }

    async fn list_stale_running(&self, cutoff: &str) -> DbResult<Vec<TimeEntry>> {
        let sql = format!(
            "SELECT {} FROM time_entry t \
             WHERE t.ended_at IS NULL AND t.last_activity_at < ? ORDER BY t.last_activity_at, t.id",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(cutoff).fetch_all(self.pool).await?;
        Ok(rows.iter().map(row_to_entry).collect())
    }

    async fn delete(&self, team_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM time_entry WHERE team_id = ? AND id = ?")
            .bind(team_id)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("TimeEntry", id));
        }

        Ok(())
    }
}
