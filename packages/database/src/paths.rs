#![allow(clippy::module_name_repetitions)]
//! Default file locations for the store.
//!
//! Relative to the working directory unless overridden by configuration.

use std::path::{Path, PathBuf};

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Returns the default path of the incident store.
#[must_use]
pub fn default_db_path() -> PathBuf {
    data_dir().join("incident_watch.duckdb")
}

/// Ensures a directory exists, creating it if necessary.
///
/// An empty path (a bare file name's parent) is treated as the current
/// directory and left alone.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
