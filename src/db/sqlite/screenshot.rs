//! SQLite ScreenshotRepository implementation.
//!
//! Only metadata lives here; image bytes are kept by a
//! [`ScreenshotStore`](crate::storage::ScreenshotStore).

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::db::utils::{current_timestamp, generate_entity_id};
use crate::db::{DbError, DbResult, Screenshot, ScreenshotRepository};

const SCREENSHOT_COLUMNS: &str =
    "id, team_id, time_entry_id, user_id, content_type, byte_size, captured_at, created_at";

fn row_to_screenshot(row: &SqliteRow) -> Screenshot {
    Screenshot {
        id: row.get("id"),
        team_id: row.get("team_id"),
        time_entry_id: row.get("time_entry_id"),
        user_id: row.get("user_id"),
        content_type: row.get("content_type"),
        byte_size: row.get("byte_size"),
        captured_at: row.get("captured_at"),
        created_at: row.get("created_at"),
    }
}

/// SQLx-backed screenshot metadata repository.
pub struct SqliteScreenshotRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

impl<'a> ScreenshotRepository for SqliteScreenshotRepository<'a> {
    async fn create(&self, screenshot: &Screenshot) -> DbResult<Screenshot> {
        let id = if screenshot.id.is_empty() {
            generate_entity_id()
        } else {
            screenshot.id.clone()
        };
        let created_at = current_timestamp();
        let captured_at = if screenshot.captured_at.is_empty() {
            created_at.clone()
        } else {
            screenshot.captured_at.clone()
        };

        let entry_exists: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM time_entry WHERE team_id = ? AND id = ?")
                .bind(&screenshot.team_id)
                .bind(&screenshot.time_entry_id)
                .fetch_one(self.pool)
                .await?;
        if entry_exists == 0 {
            return Err(DbError::not_found("TimeEntry", &screenshot.time_entry_id));
        }

        // Only insert while the entry is still running
        let result = sqlx::query(
            "INSERT INTO screenshot (id, team_id, time_entry_id, user_id, content_type, byte_size, \
             captured_at, created_at) \
             SELECT ?, ?, ?, ?, ?, ?, ?, ? WHERE EXISTS \
             (SELECT 1 FROM time_entry WHERE team_id = ? AND id = ? AND ended_at IS NULL)",
        )
        .bind(&id)
        .bind(&screenshot.team_id)
        .bind(&screenshot.time_entry_id)
        .bind(&screenshot.user_id)
        .bind(&screenshot.content_type)
        .bind(screenshot.byte_size)
        .bind(&captured_at)
        .bind(&created_at)
        .bind(&screenshot.team_id)
        .bind(&screenshot.time_entry_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict {
                message: format!(
                    "Time entry '{}' is not running",
                    screenshot.time_entry_id
                ),
            });
        }

        Ok(Screenshot {
            id,
            captured_at,
            created_at,
            ..screenshot.clone()
        })
    }

    async fn get(&self, team_id: &str, id: &str) -> DbResult<Screenshot> {
        let sql = format!(
            "SELECT {} FROM screenshot WHERE team_id = ? AND id = ?",
            SCREENSHOT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(team_id)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Screenshot", id))?;
        Ok(row_to_screenshot(&row))
    }

    async fn list_for_entry(&self, team_id: &str, time_entry_id: &str) -> DbResult<Vec<Screenshot>> {
        let sql = format!(
            "SELECT {} FROM screenshot WHERE team_id = ? AND time_entry_id = ? \
             ORDER BY captured_at, id",
            SCREENSHOT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(team_id)
            .bind(time_entry_id)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.iter().map(row_to_screenshot).collect())
    }

    async fn delete(&self, team_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM screenshot WHERE team_id = ? AND id = ?")
            .bind(team_id)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Screenshot", id));
        }

        Ok(())
    }
}
