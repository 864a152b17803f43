//! SQLite UserRepository and SessionRepository implementations.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::helpers::prefix_pattern;
use crate::db::utils::{current_timestamp, generate_entity_id};
use crate::db::{DbError, DbResult, Session, SessionRepository, User, UserRepository};

pub(crate) const USER_COLUMNS: &str =
    "u.id, u.email, u.name, u.password_hash, u.avatar_url, u.created_at, u.updated_at";

pub(crate) fn row_to_user(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        avatar_url: row.get("avatar_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// SQLx-backed user repository.
pub struct SqliteUserRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

impl<'a> UserRepository for SqliteUserRepository<'a> {
    async fn create(&self, user: &User) -> DbResult<User> {
        let id = if user.id.is_empty() {
            generate_entity_id()
        } else {
            user.id.clone()
        };
        let email = user.email.trim().to_lowercase();
        let created_at = current_timestamp();

        sqlx::query(
            "INSERT INTO user (id, email, name, password_hash, avatar_url, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.avatar_url)
        .bind(&created_at)
        .bind(&created_at)
        .execute(self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::Conflict { .. } => DbError::AlreadyExists {
                entity_type: "User".to_string(),
                id: email.clone(),
            },
            other => other,
        })?;

        Ok(User {
            id,
            email,
            name: user.name.clone(),
            password_hash: user.password_hash.clone(),
            avatar_url: user.avatar_url.clone(),
            created_at: created_at.clone(),
            updated_at: created_at,
        })
    }

    async fn get(&self, id: &str) -> DbResult<User> {
        let sql = format!("SELECT {} FROM user u WHERE u.id = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;
        Ok(row_to_user(&row))
    }

    async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {} FROM user u WHERE u.email = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn update(&self, user: &User) -> DbResult<User> {
        let updated_at = current_timestamp();
        let result = sqlx::query("UPDATE user SET name = ?, avatar_url = ?, updated_at = ? WHERE id = ?")
            .bind(&user.name)
            .bind(&user.avatar_url)
            .bind(&updated_at)
            .bind(&user.id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", &user.id));
        }

        self.get(&user.id).await
    }

    async fn search_members(&self, team_id: &str, prefix: &str, limit: usize) -> DbResult<Vec<User>> {
        let pattern = prefix_pattern(prefix);
        let sql = format!(
            "SELECT {} FROM user u JOIN team_member m ON m.user_id = u.id \
             WHERE m.team_id = ? AND (u.name LIKE ? ESCAPE '\\' OR u.email LIKE ? ESCAPE '\\') \
             ORDER BY u.name COLLATE NOCASE, u.id LIMIT ?",
            USER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(team_id)
            .bind(&pattern)
            .bind(&pattern)
            .bind(limit as i64)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.iter().map(row_to_user).collect())
    }
}

/// SQLx-backed session repository.
pub struct SqliteSessionRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

impl<'a> SessionRepository for SqliteSessionRepository<'a> {
    async fn create(&self, session: &Session) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO session (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token_hash)
        .bind(&session.user_id)
        .bind(&session.created_at)
        .bind(&session.expires_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn find_user(&self, token_hash: &str, now: &str) -> DbResult<Option<User>> {
        let sql = format!(
            "SELECT {} FROM session s JOIN user u ON u.id = s.user_id \
             WHERE s.token_hash = ? AND s.expires_at > ?",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn delete(&self, token_hash: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM session WHERE token_hash = ?")
            .bind(token_hash)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    async fn delete_expired(&self, now: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM session WHERE expires_at <= ?")
            .bind(now)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
