#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Windowed aggregation over the incident store.
//!
//! Every query is read-only and bounded to a [`TimeWindow`] of receipt
//! times. Violent and noise membership comes from one
//! [`Classifier`](incident_watch_incident_models::Classifier), translated
//! to SQL by [`filters::class_predicate`], so SQL counts agree with
//! in-memory classification.
//!
//! Degenerate windows are not errors: an empty window yields empty row
//! sets and zeroed summaries.
//!
//! [`TimeWindow`]: incident_watch_analytics_models::TimeWindow

pub mod filters;
pub mod report;
pub mod stats;

use incident_watch_database::{DbError, duckdb};
use thiserror::Error;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Query failed.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Store operation failed.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Serializing a report payload failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub(crate) fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
