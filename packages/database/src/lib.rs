#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `DuckDB` incident store.
//!
//! A single `DuckDB` file holds three tables:
//!
//! - `incidents`: one row per `(incident_id, received_at)` occurrence ever
//!   observed, with its observation window and derived grouping columns,
//! - `_meta`: key/value state (schema version, the last poll snapshot),
//! - `reports`: the archive of periodic reports, keyed by period start.
//!
//! The store assumes a single writer. Timestamps are stored as epoch seconds.

pub mod derive;
pub mod incidents;
pub mod meta;
pub mod migrate;
pub mod paths;
pub mod reports;

use std::path::Path;

use chrono::{DateTime, Utc};
use duckdb::Connection;

pub use duckdb;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` query error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// I/O error (creating the data directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization of stored state failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Opens (or creates) the store at `path` and brings its schema up to date.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or migration fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(path)?;
    migrate::migrate(&conn)?;
    log::debug!("Opened incident store at {}", path.display());

    Ok(conn)
}

/// Opens a fresh in-memory store with the current schema.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or migration fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    migrate::migrate(&conn)?;
    Ok(conn)
}

/// Converts stored epoch seconds back into a UTC timestamp.
///
/// # Errors
///
/// Returns [`DbError::Conversion`] if the value is out of range.
pub fn from_epoch(secs: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| DbError::Conversion {
        message: format!("timestamp out of range: {secs}"),
    })
}
