//! SQLite ProjectRepository implementation.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::helpers::{
    build_limit_offset_clause, build_order_clause, like_pattern, tags_from_json, tags_to_json,
};
use crate::db::utils::{current_timestamp, generate_entity_id};
use crate::db::{
    DbError, DbResult, ListResult, Project, ProjectQuery, ProjectRepository, SortOrder,
};

fn row_to_project(row: &SqliteRow) -> Project {
    let tags_json: String = row.get("tags");
    Project {
        id: row.get("id"),
        team_id: row.get("team_id"),
        title: row.get("title"),
        description: row.get("description"),
        tags: tags_from_json(&tags_json),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// SQLx-backed project repository.
pub struct SqliteProjectRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

impl<'a> ProjectRepository for SqliteProjectRepository<'a> {
    async fn create(&self, project: &Project) -> DbResult<Project> {
        // Use provided ID if not empty, otherwise generate one
        let id = if project.id.is_empty() {
            generate_entity_id()
        } else {
            project.id.clone()
        };

        // Always generate current timestamps - never use input timestamps
        let created_at = current_timestamp();
        let updated_at = created_at.clone();

        sqlx::query(
            "INSERT INTO project (id, team_id, title, description, tags, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&project.team_id)
        .bind(&project.title)
        .bind(&project.description)
        .bind(tags_to_json(&project.tags))
        .bind(&created_at)
        .bind(&updated_at)
        .execute(self.pool)
        .await?;

        Ok(Project {
            id,
            team_id: project.team_id.clone(),
            title: project.title.clone(),
            description: project.description.clone(),
            tags: project.tags.clone(),
            created_at,
            updated_at,
        })
    }

    async fn get(&self, team_id: &str, id: &str) -> DbResult<Project> {
        let row = sqlx::query(
            "SELECT id, team_id, title, description, tags, created_at, updated_at \
             FROM project WHERE team_id = ? AND id = ?",
        )
        .bind(team_id)
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Project", id))?;

        Ok(row_to_project(&row))
    }

    async fn list(&self, team_id: &str, query: Option<&ProjectQuery>) -> DbResult<ListResult<Project>> {
        let default_query = ProjectQuery::default();
        let query = query.unwrap_or(&default_query);
        let allowed_fields = ["title", "created_at", "updated_at"];

        let order_clause =
            build_order_clause(&query.page, &allowed_fields, "created_at", SortOrder::Asc, "p.");
        let limit_clause = build_limit_offset_clause(&query.page);

        // Build conditions and bind values
        let mut conditions: Vec<String> = vec!["p.team_id = ?".to_string()];
        let mut bind_values: Vec<String> = vec![team_id.to_string()];

        if let Some(tags) = &query.tags
            && !tags.is_empty()
        {
            let placeholders: Vec<&str> = tags.iter().map(|_| "?").collect();
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM json_each(p.tags) WHERE json_each.value IN ({}))",
                placeholders.join(", ")
            ));
            bind_values.extend(tags.iter().cloned());
        }

        if let Some(pattern) = query.search.as_deref().and_then(like_pattern) {
            conditions.push(
                "(p.title LIKE ? ESCAPE '\\' OR p.description LIKE ? ESCAPE '\\')".to_string(),
            );
            bind_values.push(pattern.clone());
            bind_values.push(pattern);
        }

        let where_clause = format!("WHERE {}", conditions.join(" AND "));

        let sql = format!(
            "SELECT p.id, p.team_id, p.title, p.description, p.tags, p.created_at, p.updated_at \
             FROM project p {} {} {}",
            where_clause, order_clause, limit_clause
        );
        let count_sql = format!("SELECT COUNT(*) FROM project p {}", where_clause);

        let mut sql_query = sqlx::query(&sql);
        for value in &bind_values {
            sql_query = sql_query.bind(value);
        }
        let rows = sql_query.fetch_all(self.pool).await?;
        let items: Vec<Project> = rows.iter().map(row_to_project).collect();

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

    async fn update(&self, project: &Project) -> DbResult<Project> {
        let updated_at = current_timestamp();

        let result = sqlx::query(
            "UPDATE project SET title = ?, description = ?, tags = ?, updated_at = ? \
             WHERE team_id = ? AND id = ?",
        )
        .bind(&project.title)
        .bind(&project.description)
        .bind(tags_to_json(&project.tags))
        .bind(&updated_at)
        .bind(&project.team_id)
        .bind(&project.id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Project", &project.id));
        }

        Ok(Project {
            updated_at,
            ..project.clone()
        })
    }

    async fn delete(&self, team_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM project WHERE team_id = ? AND id = ?")
            .bind(team_id)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Project", id));
        }

        Ok(())
    }
}
