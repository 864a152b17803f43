//! SQLite DocumentRepository implementation.

use std::collections::HashMap;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use super::helpers::{build_limit_offset_clause, build_order_clause, like_pattern};
use crate::db::utils::{current_timestamp, generate_entity_id};
use crate::db::{
    DbError, DbResult, Document, DocumentQuery, DocumentRepository, ListResult, ParentFilter,
    SortOrder,
};

const DOCUMENT_COLUMNS: &str = "d.id, d.team_id, d.project_id, d.parent_id, d.title, d.content, \
     d.icon, d.idx, d.version, d.created_by, d.updated_by, d.created_at, d.updated_at";

fn row_to_document(row: &SqliteRow) -> Document {
    Document {
        id: row.get("id"),
        team_id: row.get("team_id"),
        project_id: row.get("project_id"),
        parent_id: row.get("parent_id"),
        title: row.get("title"),
        content: row.get("content"),
        icon: row.get("icon"),
        idx: row.get("idx"),
        version: row.get("version"),
        created_by: row.get("created_by"),
        updated_by: row.get("updated_by"),
        mentions: vec![],
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Fail with `Validation` unless `id` names a row of `table` in the team.
async fn ensure_in_team(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    team_id: &str,
    id: &str,
) -> DbResult<()> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE team_id = ? AND id = ?", table);
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(team_id)
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;
    if count == 0 {
        return Err(DbError::Validation {
            message: format!("Unknown {} '{}'", table, id),
        });
    }
    Ok(())
}

async fn replace_mentions(
    tx: &mut Transaction<'_, Sqlite>,
    document_id: &str,
    mentions: &[String],
) -> DbResult<()> {
    sqlx::query("DELETE FROM document_mention WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut **tx)
        .await?;

    for (position, user_id) in mentions.iter().enumerate() {
        sqlx::query(
            "INSERT OR IGNORE INTO document_mention (document_id, user_id, position) VALUES (?, ?, ?)",
        )
        .bind(document_id)
        .bind(user_id)
        .bind(position as i64)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// SQLx-backed document repository.
pub struct SqliteDocumentRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

impl<'a> SqliteDocumentRepository<'a> {
    /// Attach mentions to each document with a single query.
    async fn load_mentions(&self, documents: &mut [Document]) -> DbResult<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let placeholders: Vec<&str> = documents.iter().map(|_| "?").collect();
        let sql = format!(
            "SELECT document_id, user_id FROM document_mention \
             WHERE document_id IN ({}) ORDER BY document_id, position",
            placeholders.join(", ")
        );
        let mut query = sqlx::query(&sql);
        for doc in documents.iter() {
            query = query.bind(&doc.id);
        }
        let rows = query.fetch_all(self.pool).await?;

        let mut by_doc: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            by_doc
                .entry(row.get("document_id"))
                .or_default()
                .push(row.get("user_id"));
        }
        for doc in documents.iter_mut() {
            doc.mentions = by_doc.remove(&doc.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn current_version(&self, team_id: &str, id: &str) -> DbResult<Option<i64>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM document WHERE team_id = ? AND id = ?")
                .bind(team_id)
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(version)
    }
}

impl<'a> DocumentRepository for SqliteDocumentRepository<'a> {
    async fn create(&self, document: &Document) -> DbResult<Document> {
        let id = if document.id.is_empty() {
            generate_entity_id()
        } else {
            document.id.clone()
        };
        let created_at = current_timestamp();

        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = &document.parent_id {
            ensure_in_team(&mut tx, "document", &document.team_id, parent_id).await?;
        }
        if let Some(project_id) = &document.project_id {
            ensure_in_team(&mut tx, "project", &document.team_id, project_id).await?;
        }

        sqlx::query(
            "INSERT INTO document (id, team_id, project_id, parent_id, title, content, icon, idx, \
             version, created_by, updated_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&document.team_id)
        .bind(&document.project_id)
        .bind(&document.parent_id)
        .bind(&document.title)
        .bind(&document.content)
        .bind(&document.icon)
        .bind(document.idx)
        .bind(&document.created_by)
        .bind(&document.created_by)
        .bind(&created_at)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?;

        replace_mentions(&mut tx, &id, &document.mentions).await?;

        tx.commit().await?;

        self.get(&document.team_id, &id).await
    }

    async fn get(&self, team_id: &str, id: &str) -> DbResult<Document> {
        let sql = format!(
            "SELECT {} FROM document d WHERE d.team_id = ? AND d.id = ?",
            DOCUMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(team_id)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Document", id))?;

        let mut docs = [row_to_document(&row)];
        self.load_mentions(&mut docs).await?;
        let [doc] = docs;
        Ok(doc)
    }

    async fn list(&self, team_id: &str, query: Option<&DocumentQuery>) -> DbResult<ListResult<Document>> {
        let default_query = DocumentQuery::default();
        let query = query.unwrap_or(&default_query);
        let allowed_fields = ["title", "idx", "created_at", "updated_at"];

        let order_clause =
            build_order_clause(&query.page, &allowed_fields, "created_at", SortOrder::Asc, "d.");
        let limit_clause = build_limit_offset_clause(&query.page);

        let mut conditions: Vec<String> = vec!["d.team_id = ?".to_string()];
        let mut bind_values: Vec<String> = vec![team_id.to_string()];

        if let Some(project_id) = &query.project_id {
            conditions.push("d.project_id = ?".to_string());
            bind_values.push(project_id.clone());
        }

        match &query.parent {
            Some(ParentFilter::Root) => conditions.push("d.parent_id IS NULL".to_string()),
            Some(ParentFilter::Parent(parent_id)) => {
                conditions.push("d.parent_id = ?".to_string());
                bind_values.push(parent_id.clone());
            }
            None => {}
        }

        if let Some(pattern) = query.search.as_deref().and_then(like_pattern) {
            conditions
                .push("(d.title LIKE ? ESCAPE '\\' OR d.content LIKE ? ESCAPE '\\')".to_string());
            bind_values.push(pattern.clone());
            bind_values.push(pattern);
        }

        let where_clause = format!("WHERE {}", conditions.join(" AND "));
        let sql = format!(
            "SELECT {} FROM document d {} {} {}",
            DOCUMENT_COLUMNS, where_clause, order_clause, limit_clause
        );
        let count_sql = format!("SELECT COUNT(*) FROM document d {}", where_clause);

        let mut sql_query = sqlx::query(&sql);
        for value in &bind_values {
            sql_query = sql_query.bind(value);
        }
        let rows = sql_query.fetch_all(self.pool).await?;
        let mut items: Vec<Document> = rows.iter().map(row_to_document).collect();
        self.load_mentions(&mut items).await?;

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

    async fn list_all(&self, team_id: &str, project_id: Option<&str>) -> DbResult<Vec<Document>> {
        let query = DocumentQuery {
            project_id: project_id.map(str::to_string),
            ..Default::default()
        };
        Ok(self.list(team_id, Some(&query)).await?.items)
    }

    async fn update(&self, document: &Document, expected_version: Option<i64>) -> DbResult<Document> {
        let updated_at = current_timestamp();

        let mut tx = self.pool.begin().await?;

        if let Some(project_id) = &document.project_id {
            ensure_in_team(&mut tx, "project", &document.team_id, project_id).await?;
        }

        let result = sqlx::query(
            "UPDATE document SET title = ?, content = ?, icon = ?, project_id = ?, \
             updated_by = ?, updated_at = ?, version = version + 1 \
             WHERE team_id = ? AND id = ? AND (? IS NULL OR version = ?)",
        )
        .bind(&document.title)
        .bind(&document.content)
        .bind(&document.icon)
        .bind(&document.project_id)
        .bind(&document.updated_by)
        .bind(&updated_at)
        .bind(&document.team_id)
        .bind(&document.id)
        .bind(expected_version)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            drop(tx);
            return match self.current_version(&document.team_id, &document.id).await? {
                None => Err(DbError::not_found("Document", &document.id)),
                Some(stored) => Err(DbError::Conflict {
                    message: format!(
                        "Document '{}' is at version {}, expected {}",
                        document.id,
                        stored,
                        expected_version.unwrap_or_default()
                    ),
                }),
            };
        }

        replace_mentions(&mut tx, &document.id, &document.mentions).await?;
        tx.commit().await?;

        self.get(&document.team_id, &document.id).await
    }

    async fn set_parent(
        &self,
        team_id: &str,
        id: &str,
        parent_id: Option<&str>,
        idx: Option<i64>,
        updated_by: &str,
    ) -> DbResult<Document> {
        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = parent_id {
            ensure_in_team(&mut tx, "document", team_id, parent_id).await?;
        }

        let result = sqlx::query(
            "UPDATE document SET parent_id = ?, idx = ?, updated_by = ?, updated_at = ?, \
             version = version + 1 WHERE team_id = ? AND id = ?",
        )
        .bind(parent_id)
        .bind(idx)
        .bind(updated_by)
        .bind(current_timestamp())
        .bind(team_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Document", id));
        }

        tx.commit().await?;
        self.get(team_id, id).await
    }

    async fn delete(&self, team_id: &str, id: &str) -> DbResult<()> {
        // Children go with their parent through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM document WHERE team_id = ? AND id = ?")
            .bind(team_id)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Document", id));
        }

        Ok(())
    }
}
