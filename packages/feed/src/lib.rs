#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Active-incident feed fetching and snapshot normalization.
//!
//! The feed is a list of currently active incidents. [`normalize`] turns a
//! raw payload into [`Incident`] records using a configurable
//! [`FieldMapping`], and [`fetch::HttpFeed`] implements [`IncidentFeed`] by
//! fetching that payload over HTTP with retry on transient failures.

pub mod fetch;
pub mod normalize;
pub mod parsing;
pub mod retry;

use async_trait::async_trait;
use incident_watch_incident_models::Incident;
use serde::{Deserialize, Serialize};

pub use normalize::normalize;

/// Errors that can occur while fetching or normalizing the feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("HTTP {status} from feed")]
    Status {
        /// Status code returned by the server.
        status: reqwest::StatusCode,
    },

    /// Payload is not well-formed structured data. Not retryable.
    #[error("Feed parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },
}

/// Attribute names used to read each incident field from a feed record.
///
/// Defaults match the Metro Nashville active dispatch `ArcGIS` layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct FieldMapping {
    /// Identifier attribute.
    pub id: String,
    /// Type code attribute.
    pub type_code: String,
    /// Type name attribute.
    pub type_name: String,
    /// Location attribute.
    pub location: String,
    /// Location description attribute.
    pub location_description: String,
    /// City attribute.
    pub city: String,
    /// Receipt timestamp attribute (epoch milliseconds or ISO-8601).
    pub received_at: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            id: "IncidentID".to_string(),
            type_code: "IncidentTypeCode".to_string(),
            type_name: "IncidentTypeName".to_string(),
            location: "Location".to_string(),
            location_description: "LocationDescription".to_string(),
            city: "CityName".to_string(),
            received_at: "CallReceivedTime".to_string(),
        }
    }
}

/// A source of active-incident snapshots.
///
/// Implemented over HTTP by [`fetch::HttpFeed`]; tests substitute canned
/// snapshots.
#[async_trait]
pub trait IncidentFeed: Send + Sync {
    /// Returns a human-readable label for log messages.
    fn label(&self) -> &str;

    /// Fetches and normalizes the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the fetch fails or the payload is malformed.
    async fn poll(&self) -> Result<Vec<Incident>, FeedError>;
}
