#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Row types for the incident store.
//!
//! These types represent data as stored in and retrieved from the `DuckDB`
//! store. They are distinct from the transient feed-observed
//! `Incident` type in `incident_watch_incident_models`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored occurrence, keyed by `(incident_id, received_at)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredIncident {
    /// Upstream identifier.
    pub incident_id: String,
    /// When the incident was logged upstream.
    pub received_at: DateTime<Utc>,
    /// Short type code. May be empty.
    pub type_code: String,
    /// Human-readable type name.
    pub type_name: String,
    /// Free-text location.
    pub location: Option<String>,
    /// Free-text location description.
    pub location_description: Option<String>,
    /// City name.
    pub city: Option<String>,
    /// First poll that reported this occurrence.
    pub first_seen_at: DateTime<Utc>,
    /// Last poll that reported this occurrence.
    pub last_seen_at: DateTime<Utc>,
    /// Whether the occurrence has dropped out of the feed.
    pub cleared: bool,
    /// When the occurrence was first missing from a poll.
    pub cleared_at: Option<DateTime<Utc>>,
    /// Location with house number stripped; first member of an intersection.
    pub street: Option<String>,
    /// Local hour-of-day (0-23) of `received_at`.
    pub hour_bucket: Option<u8>,
    /// Local calendar date (`YYYY-MM-DD`) of `received_at`.
    pub local_date: Option<String>,
}

impl StoredIncident {
    /// Seconds between receipt and clearing, if cleared.
    #[must_use]
    pub fn active_duration_secs(&self) -> Option<i64> {
        self.cleared_at
            .map(|cleared_at| (cleared_at - self.received_at).num_seconds())
    }
}

/// What happened when recording one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordOutcome {
    /// A new row was created.
    Inserted,
    /// The row existed and its `last_seen_at` advanced.
    Updated,
    /// The row existed but is cleared, so it was left untouched.
    Frozen,
}

/// Counts from recording a whole poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    /// New rows created.
    pub inserted: u64,
    /// Existing active rows whose `last_seen_at` advanced.
    pub updated: u64,
    /// Existing cleared rows left untouched.
    pub frozen: u64,
    /// Records that failed to write.
    pub failed: u64,
}

impl RecordSummary {
    /// Adds one outcome to the counts.
    pub const fn add(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Inserted => self.inserted += 1,
            RecordOutcome::Updated => self.updated += 1,
            RecordOutcome::Frozen => self.frozen += 1,
        }
    }
}

/// One archived periodic report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    /// Start of the reporting period. Unique.
    pub period_start: DateTime<Utc>,
    /// End of the reporting period.
    pub period_end: DateTime<Utc>,
    /// Rendered report text.
    pub text: String,
    /// Occurrences received within the period.
    pub total: u64,
    /// Violent-classified occurrences within the period.
    pub violent: u64,
    /// Occurrences within the period that have cleared.
    pub cleared: u64,
    /// Noise-classified occurrences within the period.
    pub noise: u64,
    /// JSON-serialized top streets payload.
    pub top_streets_json: String,
    /// JSON-serialized peak hours payload.
    pub peak_hours_json: String,
    /// When the report was generated.
    pub created_at: DateTime<Utc>,
}
