#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Active-incident poller.
//!
//! Wires the feed, the store, the differ, the renderer and a publisher into
//! a poll cycle, and exposes the pieces the `incident_watch` binary needs
//! to build them from a [`config::Config`].

pub mod config;
pub mod cycle;
pub mod publish;

use incident_watch_analytics::{AnalyticsError, report::ReportOptions};
use incident_watch_database::{DbError, duckdb::Connection};
use incident_watch_feed::{FeedError, fetch::HttpFeed};

use crate::config::{Config, ConfigError};
use crate::cycle::CycleSettings;
use crate::publish::{PublishError, PublishTarget, Publisher};

/// Errors that can occur while polling or reporting.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Fetching or normalizing the feed failed.
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// Store operation failed.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Aggregation failed.
    #[error("Analytics error: {0}")]
    Analytics(#[from] AnalyticsError),

    /// Configuration is invalid.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Publishing failed.
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),
}

/// Opens the configured store, migrating its schema.
///
/// # Errors
///
/// Returns [`IngestError::Database`] if the store cannot be opened.
pub fn open_store(config: &Config) -> Result<Connection, IngestError> {
    Ok(incident_watch_database::open(&config.database.path)?)
}

/// Builds the HTTP feed for the configured URL and field mapping.
///
/// # Errors
///
/// Returns [`IngestError::Feed`] if the HTTP client cannot be built.
pub fn build_feed(config: &Config) -> Result<HttpFeed, IngestError> {
    Ok(HttpFeed::new(
        &config.feed.url,
        config.feed.fields.clone(),
        config.feed.timeout(),
    )?)
}

/// Builds the configured publisher.
#[must_use]
pub fn build_publisher(config: &Config) -> Box<dyn Publisher> {
    publish::from_webhook_url(config.publish.webhook_url.as_deref())
}

/// Per-cycle settings from configuration.
///
/// # Errors
///
/// Returns [`IngestError::Config`] if the time zone is unknown.
pub fn cycle_settings(config: &Config) -> Result<CycleSettings, IngestError> {
    Ok(CycleSettings {
        tz: config.tz()?,
        budget: config.publish.message_budget,
        announce_first_poll: config.publish.announce_first_poll,
        target: PublishTarget {
            message_id: config.publish.edit_message_id.clone(),
        },
    })
}

/// Weekly report shape from configuration.
#[must_use]
pub fn report_options(config: &Config) -> ReportOptions {
    ReportOptions {
        title: config.report.title.clone(),
        days: config.report.days,
        top_n: config.report.top_n,
        budget: config.publish.message_budget,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config() {
        let mut config = Config::default();
        config.publish.edit_message_id = Some("99".to_string());
        config.publish.message_budget = 500;
        config.report.top_n = 3;

        let settings = cycle_settings(&config).unwrap();
        assert_eq!(settings.tz, chrono_tz::America::Chicago);
        assert_eq!(settings.budget, 500);
        assert!(!settings.announce_first_poll);
        assert_eq!(settings.target.message_id.as_deref(), Some("99"));

        let options = report_options(&config);
        assert_eq!(options.top_n, 3);
        assert_eq!(options.budget, 500);
        assert_eq!(options.days, 7);
    }

    #[test]
    fn default_publisher_is_stdout() {
        assert_eq!(build_publisher(&Config::default()).label(), "stdout");
    }

    #[test]
    fn feed_builds_from_default_config() {
        let feed = build_feed(&Config::default()).unwrap();
        assert!(incident_watch_feed::IncidentFeed::label(&feed).starts_with("https://"));
    }
}
