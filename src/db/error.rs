//! Database error types.
//!
//! This module provides abstracted error types for database operations.
//! It uses miette for fancy diagnostic output and thiserror for derive macros.
//! The error types are storage-backend agnostic.

use miette::Diagnostic;
use thiserror::Error;

/// Database operation errors.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Entity not found: {entity_type} with id '{id}'")]
    #[diagnostic(code(docuflow::db::not_found))]
    NotFound { entity_type: String, id: String },

    #[error("Entity already exists: {entity_type} with id '{id}'")]
    #[diagnostic(code(docuflow::db::already_exists))]
    AlreadyExists { entity_type: String, id: String },

    #[error("Invalid data: {message} (hint: {help})")]
    #[diagnostic(code(docuflow::db::invalid_data))]
    InvalidData { message: String, help: String },

    #[error("Validation error: {message}")]
    #[diagnostic(code(docuflow::db::validation_error))]
    Validation { message: String },

    #[error("Conflict: {message}")]
    #[diagnostic(code(docuflow::db::conflict))]
    Conflict { message: String },

    #[error("Database error: {message}")]
    #[diagnostic(code(docuflow::db::database_error))]
    Database { message: String },

    #[error("Migration error: {message}")]
    #[diagnostic(code(docuflow::db::migration_error))]
    Migration { message: String },

    #[error("Connection error: {message}")]
    #[diagnostic(code(docuflow::db::connection_error))]
    Connection { message: String },

    #[error("Constraint violation: {message}")]
    #[diagnostic(code(docuflow::db::constraint))]
    Constraint { message: String },
}

impl DbError {
    pub(crate) fn not_found(entity_type: &str, id: &str) -> Self {
        DbError::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            // SQLite reports both UNIQUE and FOREIGN KEY failures as constraint errors
            if db_err.is_unique_violation() {
                return DbError::Conflict {
                    message: db_err.message().to_string(),
                };
            }
            if db_err.is_foreign_key_violation() || db_err.is_check_violation() {
                return DbError::Constraint {
                    message: db_err.message().to_string(),
                };
            }
        }
        DbError::Database {
            message: e.to_string(),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
