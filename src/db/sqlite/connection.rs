//! SQLite database connection and migration management.

use std::path::Path;
use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use super::{
    SqliteCrmClientRepository, SqliteCrmTagRepository, SqliteDocumentRepository,
    SqliteProjectRepository, SqliteScreenshotRepository, SqliteSessionRepository,
    SqliteTeamRepository, SqliteTimeEntryRepository, SqliteUserRepository,
};
use crate::db::{Database, DbError, DbResult};

// Embed migrations from data/sql/sqlite/ at compile time
static MIGRATOR: Migrator = sqlx::migrate!("data/sql/sqlite");

/// SQLite database implementation.
///
/// Provides access to repositories via associated types, avoiding dynamic dispatch.
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open (or create) a database at the given path.
    pub async fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let url = format!("sqlite://{}", path.as_ref().display());
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (useful for testing).
    ///
    /// Uses a single connection: every SQLite in-memory connection is a
    /// separate database.
    pub async fn in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    /// Access the underlying pool.
    ///
    /// Useful for tests and advanced operations that need direct database access.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl Database for SqliteDatabase {
    type Users<'a> = SqliteUserRepository<'a>;
    type Sessions<'a> = SqliteSessionRepository<'a>;
    type Teams<'a> = SqliteTeamRepository<'a>;
    type Projects<'a> = SqliteProjectRepository<'a>;
    type Documents<'a> = SqliteDocumentRepository<'a>;
    type CrmTags<'a> = SqliteCrmTagRepository<'a>;
    type CrmClients<'a> = SqliteCrmClientRepository<'a>;
    type TimeEntries<'a> = SqliteTimeEntryRepository<'a>;
    type Screenshots<'a> = SqliteScreenshotRepository<'a>;

    async fn migrate(&self) -> DbResult<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| DbError::Migration {
                message: e.to_string(),
            })
    }

    fn users(&self) -> Self::Users<'_> {
        SqliteUserRepository { pool: &self.pool }
    }

    fn sessions(&self) -> Self::Sessions<'_> {
        SqliteSessionRepository { pool: &self.pool }
    }

    fn teams(&self) -> Self::Teams<'_> {
        SqliteTeamRepository { pool: &self.pool }
    }

    fn projects(&self) -> Self::Projects<'_> {
        SqliteProjectRepository { pool: &self.pool }
    }

    fn documents(&self) -> Self::Documents<'_> {
        SqliteDocumentRepository { pool: &self.pool }
    }

    fn crm_tags(&self) -> Self::CrmTags<'_> {
        SqliteCrmTagRepository { pool: &self.pool }
    }

    fn crm_clients(&self) -> Self::CrmClients<'_> {
        SqliteCrmClientRepository { pool: &self.pool }
    }

    fn time_entries(&self) -> Self::TimeEntries<'_> {
        SqliteTimeEntryRepository { pool: &self.pool }
    }

    fn screenshots(&self) -> Self::Screenshots<'_> {
        SqliteScreenshotRepository { pool: &self.pool }
    }
}
