//! Application state for the API server.

use std::sync::Arc;

use super::Config;
use super::notifier::ChangeNotifier;
use crate::db::Database;
use crate::storage::ScreenshotStore;

/// Shared application state.
///
/// Generic over `D: Database` and `S: ScreenshotStore` so tests can run
/// against an in-memory database and a mocked or temporary store.
pub struct AppState<D: Database, S: ScreenshotStore + Send + Sync> {
    db: Arc<D>,
    store: Arc<S>,
    notifier: ChangeNotifier,
    config: Arc<Config>,
}

// Manual Clone impl - only the Arcs are cloned, D and S need not be Clone
impl<D: Database, S: ScreenshotStore + Send + Sync> Clone for AppState<D, S> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            store: Arc::clone(&self.store),
            notifier: self.notifier.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<D: Database, S: ScreenshotStore + Send + Sync> AppState<D, S> {
    pub fn new(db: D, store: S, notifier: ChangeNotifier, config: Config) -> Self {
        Self {
            db: Arc::new(db),
            store: Arc::new(store),
            notifier,
            config: Arc::new(config),
        }
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &D {
        &self.db
    }

    /// Get a cloned Arc to the database.
    ///
    /// Useful for passing the database to background tasks.
    pub fn db_arc(&self) -> Arc<D> {
        Arc::clone(&self.db)
    }

    /// Get a cloned Arc to the screenshot store (for blocking I/O tasks).
    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    /// Get a reference to the change notifier.
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
