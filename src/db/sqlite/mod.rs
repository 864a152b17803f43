//! SQLite implementation of the database traits.
//!
//! This module provides a SQLite-backed implementation of the repository
//! traits defined in the parent module.

mod connection;
mod crm;
mod document;
mod helpers;
mod project;
mod screenshot;
mod team;
mod time_entry;
mod user;

#[cfg(test)]
mod crm_test;
#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod team_test;
#[cfg(test)]
mod time_entry_test;
#[cfg(test)]
mod user_test;

pub use connection::SqliteDatabase;
pub use crm::{SqliteCrmClientRepository, SqliteCrmTagRepository};
pub use document::SqliteDocumentRepository;
pub use project::SqliteProjectRepository;
pub use screenshot::SqliteScreenshotRepository;
pub use team::SqliteTeamRepository;
pub use time_entry::SqliteTimeEntryRepository;
pub use user::{SqliteSessionRepository, SqliteUserRepository};
