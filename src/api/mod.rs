//! REST API server.

mod extract;
pub mod notifier;
pub mod routes;
mod state;
pub mod v1;
mod websocket;

#[cfg(test)]
mod mod_test;
#[cfg(test)]
pub(crate) mod test_helpers;
#[cfg(test)]
mod websocket_test;

use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub use extract::{AuthUser, ImageBody, JsonBody, TeamScope};
pub use notifier::{ChangeNotifier, TeamUpdate, UpdateMessage};
pub use state::AppState;

use crate::db::utils::current_timestamp;
use crate::db::{Database, DbError, SessionRepository};
use crate::storage::FsScreenshotStore;
use crate::storage::paths::get_screenshot_dir;
use crate::tracking::spawn_reaper_task;

/// API server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Verbosity level (0 = warn, 1 = info, 2 = debug, 3+ = trace)
    pub verbosity: u8,
    /// Serve OpenAPI docs at /docs
    pub enable_docs: bool,
    /// Lifetime of a login session
    pub session_ttl_hours: i64,
    /// Activity gaps longer than this count as idle time
    pub idle_threshold_secs: i64,
    /// Running timers without activity for this long are stopped
    pub auto_stop_after_secs: i64,
    /// How often the idle reaper runs
    pub reaper_interval_secs: u64,
    /// Largest accepted screenshot upload
    pub max_screenshot_bytes: usize,
    /// Root of the database and screenshot store
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3737,
            verbosity: 0,
            enable_docs: false,
            session_ttl_hours: 720,
            idle_threshold_secs: 300,
            auto_stop_after_secs: 1800,
            reaper_interval_secs: 60,
            max_screenshot_bytes: 10 * 1024 * 1024,
            data_dir: PathBuf::from("."),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring unparsable environment override");
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    /// Defaults overridden by `DOCUFLOW_*` environment variables.
    pub fn from_env(data_dir: PathBuf) -> Self {
        let d = Self::default();
        Self {
            host: env_or("DOCUFLOW_HOST", d.host),
            port: env_or("DOCUFLOW_PORT", d.port),
            verbosity: d.verbosity,
            enable_docs: d.enable_docs,
            session_ttl_hours: env_or("DOCUFLOW_SESSION_TTL_HOURS", d.session_ttl_hours),
            idle_threshold_secs: env_or("DOCUFLOW_IDLE_THRESHOLD_SECS", d.idle_threshold_secs),
            auto_stop_after_secs: env_or("DOCUFLOW_AUTO_STOP_AFTER_SECS", d.auto_stop_after_secs),
            reaper_interval_secs: env_or("DOCUFLOW_REAPER_INTERVAL_SECS", d.reaper_interval_secs),
            max_screenshot_bytes: env_or("DOCUFLOW_MAX_SCREENSHOT_BYTES", d.max_screenshot_bytes),
            data_dir,
        }
    }
}

/// Errors that stop the server.
#[derive(Error, Diagnostic, Debug)]
pub enum ApiError {
    #[error("Failed to bind {addr}: {source}")]
    #[diagnostic(code(docuflow::api::bind), help("Is another server already using this port?"))]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    #[diagnostic(code(docuflow::api::serve))]
    Serve(#[source] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DbError),
}

/// Filter directive for a verbosity level.
pub(crate) fn filter_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "docuflow=warn,tower_http=warn",
        1 => "docuflow=info,tower_http=info",
        2 => "docuflow=debug,tower_http=debug",
        _ => "docuflow=trace,tower_http=trace",
    }
}

/// Initialize tracing subscriber. `RUST_LOG` wins over verbosity.
fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_for_verbosity(verbosity)));

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Run the API server with the given configuration and database.
pub async fn run<D: Database + 'static>(config: Config, db: D) -> Result<(), ApiError> {
    init_tracing(config.verbosity);

    let removed = db.sessions().delete_expired(&current_timestamp()).await?;
    if removed > 0 {
        info!(removed, "purged expired sessions");
    }

    let store = FsScreenshotStore::new(get_screenshot_dir(Some(&config.data_dir)));
    let notifier = ChangeNotifier::new();
    let state = AppState::new(db, store, notifier.clone(), config.clone());

    let cancel = CancellationToken::new();
    let reaper = spawn_reaper_task(
        state.db_arc(),
        notifier,
        Duration::from_secs(config.reaper_interval_secs.max(1)),
        config.auto_stop_after_secs,
        cancel.clone(),
    );

    let app = routes::create_router(state, config.enable_docs).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ApiError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("API server listening on http://{}", addr);

    let shutdown = cancel.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
            shutdown.cancel();
        })
        .await
        .map_err(ApiError::Serve);

    cancel.cancel();
    let _ = reaper.await;
    result
}
