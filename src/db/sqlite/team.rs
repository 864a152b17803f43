//! SQLite TeamRepository implementation.

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use super::user::{USER_COLUMNS, row_to_user};
use crate::db::utils::{current_timestamp, generate_entity_id};
use crate::db::{
    DbError, DbResult, Team, TeamMember, TeamMembership, TeamRepository, TeamRole,
};

fn parse_role(s: &str) -> DbResult<TeamRole> {
    TeamRole::from_str(s).map_err(|message| DbError::InvalidData {
        message,
        help: "Valid roles are owner, admin, member".to_string(),
    })
}

fn row_to_team(row: &SqliteRow) -> Team {
    Team {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

async fn owner_count(tx: &mut Transaction<'_, Sqlite>, team_id: &str) -> DbResult<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM team_member WHERE team_id = ? AND role = 'owner'")
            .bind(team_id)
            .fetch_one(&mut **tx)
            .await?;
    Ok(count)
}

async fn current_role(
    tx: &mut Transaction<'_, Sqlite>,
    team_id: &str,
    user_id: &str,
) -> DbResult<TeamRole> {
    let role: Option<String> =
        sqlx::query_scalar("SELECT role FROM team_member WHERE team_id = ? AND user_id = ?")
            .bind(team_id)
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;
    match role {
        Some(role) => parse_role(&role),
        None => Err(DbError::not_found("TeamMember", user_id)),
    }
}

/// SQLx-backed team repository.
pub struct SqliteTeamRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

impl<'a> SqliteTeamRepository<'a> {
    async fn get_member(&self, team_id: &str, user_id: &str) -> DbResult<TeamMember> {
        let sql = format!(
            "SELECT {}, m.team_id, m.role, m.joined_at FROM team_member m \
             JOIN user u ON u.id = m.user_id WHERE m.team_id = ? AND m.user_id = ?",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(team_id)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("TeamMember", user_id))?;
        row_to_member(&row)
    }
}

fn row_to_member(row: &SqliteRow) -> DbResult<TeamMember> {
    let role: String = row.get("role");
    Ok(TeamMember {
        team_id: row.get("team_id"),
        user: row_to_user(row),
        role: parse_role(&role)?,
        joined_at: row.get("joined_at"),
    })
}

impl<'a> TeamRepository for SqliteTeamRepository<'a> {
    async fn create(&self, team: &Team, owner_id: &str) -> DbResult<Team> {
        let id = if team.id.is_empty() {
            generate_entity_id()
        } else {
            team.id.clone()
        };
        let created_at = current_timestamp();

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO team (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(&team.name)
            .bind(&created_at)
            .bind(&created_at)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO team_member (team_id, user_id, role, joined_at) VALUES (?, ?, 'owner', ?)",
        )
        .bind(&id)
        .bind(owner_id)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Team {
            id,
            name: team.name.clone(),
            created_at: created_at.clone(),
            updated_at: created_at,
        })
    }

    async fn get(&self, id: &str) -> DbResult<Team> {
        let row = sqlx::query("SELECT id, name, created_at, updated_at FROM team WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Team", id))?;
        Ok(row_to_team(&row))
    }

    async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<TeamMembership>> {
        let rows = sqlx::query(
            "SELECT t.id, t.name, t.created_at, t.updated_at, m.role \
             FROM team t JOIN team_member m ON m.team_id = t.id \
             WHERE m.user_id = ? ORDER BY t.name COLLATE NOCASE, t.id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let role: String = row.get("role");
                Ok(TeamMembership {
                    team: row_to_team(row),
                    role: parse_role(&role)?,
                })
            })
            .collect()
    }

    async fn update(&self, team: &Team) -> DbResult<Team> {
        let updated_at = current_timestamp();
        let result = sqlx::query("UPDATE team SET name = ?, updated_at = ? WHERE id = ?")
            .bind(&team.name)
            .bind(&updated_at)
            .bind(&team.id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Team", &team.id));
        }

        self.get(&team.id).await
    }

    async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM team WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Team", id));
        }

        Ok(())
    }

    async fn get_role(&self, team_id: &str, user_id: &str) -> DbResult<Option<TeamRole>> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT role FROM team_member WHERE team_id = ? AND user_id = ?")
                .bind(team_id)
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?;
        role.as_deref().map(parse_role).transpose()
    }

    async fn list_members(&self, team_id: &str) -> DbResult<Vec<TeamMember>> {
        let sql = format!(
            "SELECT {}, m.team_id, m.role, m.joined_at FROM team_member m \
             JOIN user u ON u.id = m.user_id WHERE m.team_id = ? \
             ORDER BY m.joined_at, u.name COLLATE NOCASE",
            USER_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(team_id).fetch_all(self.pool).await?;
        rows.iter().map(row_to_member).collect()
    }

    async fn add_member(&self, team_id: &str, user_id: &str, role: TeamRole) -> DbResult<TeamMember> {
        sqlx::query("INSERT INTO team_member (team_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)")
            .bind(team_id)
            .bind(user_id)
            .bind(role.to_string())
            .bind(current_timestamp())
            .execute(self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::Conflict { .. } => DbError::AlreadyExists {
                    entity_type: "TeamMember".to_string(),
                    id: user_id.to_string(),
                },
                other => other,
            })?;

        self.get_member(team_id, user_id).await
    }

    async fn set_role(&self, team_id: &str, user_id: &str, role: TeamRole) -> DbResult<TeamMember> {
        let mut tx = self.pool.begin().await?;

        let existing = current_role(&mut tx, team_id, user_id).await?;
        if existing == TeamRole::Owner
            && role != TeamRole::Owner
            && owner_count(&mut tx, team_id).await? <= 1
        {
            return Err(DbError::Conflict {
                message: "A team must keep at least one owner".to_string(),
            });
        }

        sqlx::query("UPDATE team_member SET role = ? WHERE team_id = ? AND user_id = ?")
            .bind(role.to_string())
            .bind(team_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_member(team_id, user_id).await
    }

    async fn remove_member(&self, team_id: &str, user_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let existing = current_role(&mut tx, team_id, user_id).await?;
        if existing == TeamRole::Owner && owner_count(&mut tx, team_id).await? <= 1 {
            return Err(DbError::Conflict {
                message: "A team must keep at least one owner".to_string(),
            });
        }

        sqlx::query("DELETE FROM team_member WHERE team_id = ? AND user_id = ?")
            .bind(team_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
