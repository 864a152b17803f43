//! Path resolution for DocuFlow directories.
//!
//! Resolution order for the data directory:
//! 1. explicit override (the `--home` flag)
//! 2. `DOCUFLOW_HOME`
//! 3. `$XDG_DATA_HOME/docuflow`
//! 4. `$HOME/.local/share/docuflow`

use std::env;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "docuflow";

/// Get the data directory, honouring an explicit override first.
pub fn get_data_dir(home_override: Option<&Path>) -> PathBuf {
    if let Some(home) = home_override {
        return home.to_path_buf();
    }

    if let Ok(home) = env::var("DOCUFLOW_HOME")
        && !home.is_empty()
    {
        return PathBuf::from(home);
    }

    let data_home = env::var("XDG_DATA_HOME")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            // Without HOME fall back to the working directory
            let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".local/share")
        });

    data_home.join(APP_DIR)
}

/// Get database file path (data_dir/docuflow.db).
pub fn get_db_path(home_override: Option<&Path>) -> PathBuf {
    get_data_dir(home_override).join("docuflow.db")
}

/// Get screenshot directory (data_dir/screenshots).
pub fn get_screenshot_dir(home_override: Option<&Path>) -> PathBuf {
    get_data_dir(home_override).join("screenshots")
}
