//! API server command

use std::net::IpAddr;
use std::path::PathBuf;

use miette::{IntoDiagnostic, Result};

use crate::api::{self, Config};
use crate::db::Database;
use crate::db::sqlite::SqliteDatabase;
use crate::storage::paths::{get_data_dir, get_db_path};

/// Server flags from the command line; unset flags fall back to env and defaults.
#[derive(Debug, Default)]
pub struct ServeArgs {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub home: Option<PathBuf>,
    pub verbosity: u8,
    pub enable_docs: bool,
}

/// Resolve the server configuration: flags > `DOCUFLOW_*` env > defaults.
pub fn resolve_config(args: &ServeArgs) -> Config {
    let data_dir = get_data_dir(args.home.as_deref());
    let mut config = Config::from_env(data_dir);
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    config.verbosity = args.verbosity;
    config.enable_docs = args.enable_docs;
    config
}

/// Run the API server
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = resolve_config(&args);
    let db_path = get_db_path(Some(&config.data_dir));

    println!("Opening database at {:?}", db_path);

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).into_diagnostic()?;
    }

    let db = SqliteDatabase::open(&db_path).await?;

    // Run migrations before starting the server
    db.migrate().await?;
    println!("Database migrations complete");

    // Print startup banner BEFORE starting server (before logging is initialized)
    println!();
    println!("🚀 DocuFlow API server starting...");
    println!("   API:      http://{}:{}/api/v1", config.host, config.port);
    println!("   Updates:  ws://{}:{}/ws", config.host, config.port);
    if config.enable_docs {
        println!("   Docs:     http://{}:{}/docs", config.host, config.port);
    }
    println!();
    println!("   Data:     {}", config.data_dir.display());
    println!();

    api::run(config, db).await?;

    Ok(())
}
