//! SQLite CRM repositories (tags and clients).

use std::collections::HashMap;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use super::helpers::{build_limit_offset_clause, build_order_clause, like_pattern};
use crate::db::utils::{current_timestamp, generate_entity_id};
use crate::db::{
    ClientQuery, CrmClient, CrmClientRepository, CrmTag, CrmTagRepository, DbError, DbResult,
    ListResult, SortOrder,
};

// =============================================================================
// Tags
// =============================================================================

fn row_to_tag(row: &SqliteRow) -> CrmTag {
    CrmTag {
        id: row.get("id"),
        team_id: row.get("team_id"),
        name: row.get("name"),
        color: row.get("color"),
        created_at: row.get("created_at"),
    }
}

fn duplicate_tag(name: &str) -> impl FnOnce(sqlx::Error) -> DbError + '_ {
    move |e| match DbError::from(e) {
        DbError::Conflict { .. } => DbError::AlreadyExists {
            entity_type: "CrmTag".to_string(),
            id: name.to_string(),
        },
        other => other,
    }
}

/// SQLx-backed CRM tag repository.
pub struct SqliteCrmTagRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

impl<'a> CrmTagRepository for SqliteCrmTagRepository<'a> {
    async fn create(&self, tag: &CrmTag) -> DbResult<CrmTag> {
        let id = if tag.id.is_empty() {
            generate_entity_id()
        } else {
            tag.id.clone()
        };
        let created_at = current_timestamp();

        sqlx::query(
            "INSERT INTO crm_tag (id, team_id, name, color, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&tag.team_id)
        .bind(&tag.name)
        .bind(&tag.color)
        .bind(&created_at)
        .execute(self.pool)
        .await
        .map_err(duplicate_tag(&tag.name))?;

        Ok(CrmTag {
            id,
            created_at,
            ..tag.clone()
        })
    }

    async fn get(&self, team_id: &str, id: &str) -> DbResult<CrmTag> {
        let row = sqlx::query(
            "SELECT id, team_id, name, color, created_at FROM crm_tag WHERE team_id = ? AND id = ?",
        )
        .bind(team_id)
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("CrmTag", id))?;
        Ok(row_to_tag(&row))
    }

    async fn list(&self, team_id: &str) -> DbResult<Vec<CrmTag>> {
        let rows = sqlx::query(
            "SELECT id, team_id, name, color, created_at FROM crm_tag WHERE team_id = ? \
             ORDER BY name COLLATE NOCASE, id",
        )
        .bind(team_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.iter().map(row_to_tag).collect())
    }

    async fn update(&self, tag: &CrmTag) -> DbResult<CrmTag> {
        let result = sqlx::query("UPDATE crm_tag SET name = ?, color = ? WHERE team_id = ? AND id = ?")
            .bind(&tag.name)
            .bind(&tag.color)
            .bind(&tag.team_id)
            .bind(&tag.id)
            .execute(self.pool)
            .await
            .map_err(duplicate_tag(&tag.name))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CrmTag", &tag.id));
        }

        self.get(&tag.team_id, &tag.id).await
    }

    async fn delete(&self, team_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM crm_tag WHERE team_id = ? AND id = ?")
            .bind(team_id)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CrmTag", id));
        }

        Ok(())
    }
}

// =============================================================================
// Clients
// =============================================================================

const CLIENT_COLUMNS: &str =
    "c.id, c.team_id, c.name, c.email, c.phone, c.company, c.notes, c.created_at, c.updated_at";

fn row_to_client(row: &SqliteRow) -> CrmClient {
    CrmClient {
        id: row.get("id"),
        team_id: row.get("team_id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        company: row.get("company"),
        notes: row.get("notes"),
        tag_ids: vec![],
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Replace a client's tag links, rejecting tags from other teams.
async fn replace_tags(
    tx: &mut Transaction<'_, Sqlite>,
    team_id: &str,
    client_id: &str,
    tag_ids: &[String],
) -> DbResult<()> {
    sqlx::query("DELETE FROM crm_client_tag WHERE client_id = ?")
        .bind(client_id)
        .execute(&mut **tx)
        .await?;

    for tag_id in tag_ids {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM crm_tag WHERE team_id = ? AND id = ?")
                .bind(team_id)
                .bind(tag_id)
                .fetch_one(&mut **tx)
                .await?;
        if count == 0 {
            return Err(DbError::Validation {
                message: format!("Unknown tag '{}'", tag_id),
            });
        }

        sqlx::query("INSERT OR IGNORE INTO crm_client_tag (client_id, tag_id) VALUES (?, ?)")
            .bind(client_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// SQLx-backed CRM client repository.
pub struct SqliteCrmClientRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

impl<'a> SqliteCrmClientRepository<'a> {
    async fn load_tags(&self, clients: &mut [CrmClient]) -> DbResult<()> {
        if clients.is_empty() {
            return Ok(());
        }
        let placeholders: Vec<&str> = clients.iter().map(|_| "?").collect();
        let sql = format!(
            "SELECT ct.client_id, ct.tag_id FROM crm_client_tag ct \
             JOIN crm_tag t ON t.id = ct.tag_id \
             WHERE ct.client_id IN ({}) ORDER BY t.name COLLATE NOCASE",
            placeholders.join(", ")
        );
        let mut query = sqlx::query(&sql);
        for client in clients.iter() {
            query = query.bind(&client.id);
        }
        let rows = query.fetch_all(self.pool).await?;

        let mut by_client: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            by_client
                .entry(row.get("client_id"))
                .or_default()
                .push(row.get("tag_id"));
        }
        for client in clients.iter_mut() {
            client.tag_ids = by_client.remove(&client.id).unwrap_or_default();
        }
        Ok(())
    }
}

impl<'a> CrmClientRepository for SqliteCrmClientRepository<'a> {
    async fn create(&self, client: &CrmClient) -> DbResult<CrmClient> {
        let id = if client.id.is_empty() {
            generate_entity_id()
        } else {
            client.id.clone()
        };
        let created_at = current_timestamp();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO crm_client (id, team_id, name, email, phone, company, notes, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&client.team_id)
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.company)
        .bind(&client.notes)
        .bind(&created_at)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?;

        replace_tags(&mut tx, &client.team_id, &id, &client.tag_ids).await?;
        tx.commit().await?;

        self.get(&client.team_id, &id).await
    }

    async fn get(&self, team_id: &str, id: &str) -> DbResult<CrmClient> {
        let sql = format!(
            "SELECT {} FROM crm_client c WHERE c.team_id = ? AND c.id = ?",
            CLIENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(team_id)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("CrmClient", id))?;

        let mut clients = [row_to_client(&row)];
        self.load_tags(&mut clients).await?;
        let [client] = clients;
        Ok(client)
    }

    async fn list(&self, team_id: &str, query: Option<&ClientQuery>) -> DbResult<ListResult<CrmClient>> {
        let default_query = ClientQuery::default();
        let query = query.unwrap_or(&default_query);
        let allowed_fields = ["name", "email", "company", "created_at", "updated_at"];

        let order_clause =
            build_order_clause(&query.page, &allowed_fields, "name", SortOrder::Asc, "c.");
        let limit_clause = build_limit_offset_clause(&query.page);

        let mut conditions: Vec<String> = vec!["c.team_id = ?".to_string()];
        let mut bind_values: Vec<String> = vec![team_id.to_string()];

        if let Some(tag_id) = &query.tag_id {
            conditions.push(
                "EXISTS (SELECT 1 FROM crm_client_tag ct WHERE ct.client_id = c.id AND ct.tag_id = ?)"
                    .to_string(),
            );
            bind_values.push(tag_id.clone());
        }

        if let Some(pattern) = query.search.as_deref().and_then(like_pattern) {
            conditions.push(
                "(c.name LIKE ? ESCAPE '\\' OR c.email LIKE ? ESCAPE '\\' OR c.company LIKE ? ESCAPE '\\')"
                    .to_string(),
            );
            bind_values.push(pattern.clone());
            bind_values.push(pattern.clone());
            bind_values.push(pattern);
        }

        let where_clause = format!("WHERE {}", conditions.join(" AND "));
        let sql = format!(
            "SELECT {} FROM crm_client c {} {} {}",
            CLIENT_COLUMNS, where_clause, order_clause, limit_clause
        );
        let count_sql = format!("SELECT COUNT(*) FROM crm_client c {}", where_clause);

        let mut sql_query = sqlx::query(&sql);
        for value in &bind_values {
            sql_query = sql_query.bind(value);
        }
        let rows = sql_query.fetch_all(self.pool).await?;
        let mut items: Vec<CrmClient> = rows.iter().map(row_to_client).collect();
        self.load_tags(&mut items).await?;

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

    async fn update(&self, client: &CrmClient) -> DbResult<CrmClient> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE crm_client SET name = ?, email = ?, phone = ?, company = ?, notes = ?, updated_at = ? \
             WHERE team_id = ? AND id = ?",
        )
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.company)
        .bind(&client.notes)
        .bind(current_timestamp())
        .bind(&client.team_id)
        .bind(&client.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CrmClient", &client.id));
        }

        replace_tags(&mut tx, &client.team_id, &client.id, &client.tag_ids).await?;
        tx.commit().await?;

        self.get(&client.team_id, &client.id).await
    }

    async fn delete(&self, team_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM crm_client WHERE team_id = ? AND id = ?")
            .bind(team_id)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CrmClient", id));
        }

        Ok(())
    }
}
