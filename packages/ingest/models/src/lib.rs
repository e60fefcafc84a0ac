#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Poll cycle outcome types.

use std::time::Duration;

use incident_watch_database_models::RecordSummary;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// What a completed poll cycle did about publishing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleStatus {
    /// First poll against an empty snapshot; recorded but not announced.
    Baseline,
    /// Identifier set identical to the previous poll; nothing rendered.
    Unchanged,
    /// Changes were rendered and published.
    Published,
    /// Changes were rendered but the publisher failed.
    PublishFailed,
}

/// Counts and timing of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleOutcome {
    /// Publishing decision.
    pub status: CycleStatus,
    /// Incidents returned by the feed.
    pub fetched: usize,
    /// Incidents whose id was not in the previous snapshot.
    pub new: usize,
    /// Previous incidents missing from this poll.
    pub cleared: usize,
    /// Store rows marked cleared.
    pub cleared_rows: u64,
    /// Store write counts.
    pub recorded: RecordSummary,
    /// Fingerprint of this poll's identifier set.
    pub fingerprint: String,
    /// Lines left out of the published message.
    pub omitted: usize,
    /// Wall time of the cycle.
    pub elapsed: Duration,
}

impl CycleOutcome {
    /// Whether the rendered changes reached the publisher.
    #[must_use]
    pub const fn published(&self) -> bool {
        matches!(self.status, CycleStatus::Published)
    }
}
