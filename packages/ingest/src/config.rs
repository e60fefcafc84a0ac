//! Poller configuration.
//!
//! The default configuration is a TOML file embedded at compile time. A
//! file passed on the command line replaces it section by section, and a
//! few environment variables override individual values last.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use incident_watch_feed::FieldMapping;
use incident_watch_incident_models::Classifier;
use serde::{Deserialize, Serialize};

/// The embedded default configuration.
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Overrides the store path.
pub const ENV_DB: &str = "INCIDENT_WATCH_DB";
/// Overrides the feed URL.
pub const ENV_FEED_URL: &str = "INCIDENT_WATCH_FEED_URL";
/// Sets the webhook URL.
pub const ENV_WEBHOOK_URL: &str = "INCIDENT_WATCH_WEBHOOK_URL";
/// Overrides the IANA time zone.
pub const ENV_TIMEZONE: &str = "INCIDENT_WATCH_TIMEZONE";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`Config`].
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Time zone name is not a known IANA zone.
    #[error("Unknown time zone: {name}")]
    Timezone {
        /// The rejected name.
        name: String,
    },

    /// A value is out of range.
    #[error("Invalid config value: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// Store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `DuckDB` file path.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: incident_watch_database::paths::default_db_path(),
        }
    }
}

/// Feed settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// JSON endpoint returning the active incidents.
    pub url: String,
    /// Seconds between poll cycles.
    pub poll_interval_secs: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Attribute names of each incident field.
    pub fields: FieldMapping,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "https://services2.arcgis.com/HdTo6HJqh92wn4D8/arcgis/rest/services/Metro_Nashville_Police_Department_Active_Dispatch_Table_view/FeatureServer/0/query?where=1%3D1&outFields=*&f=json".to_string(),
            poll_interval_secs: 60,
            timeout_secs: 20,
            fields: FieldMapping::default(),
        }
    }
}

impl FeedConfig {
    /// Poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Publishing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Chat webhook URL. Messages go to stdout when unset.
    pub webhook_url: Option<String>,
    /// Existing message to edit instead of posting new ones.
    pub edit_message_id: Option<String>,
    /// Maximum characters per message.
    pub message_budget: usize,
    /// Announce every incident of the first poll as new.
    pub announce_first_poll: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            edit_message_id: None,
            message_budget: 2000,
            announce_first_poll: false,
        }
    }
}

/// Report settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Title line prefix.
    pub title: String,
    /// Whole local days before today covered by the weekly report.
    pub days: u32,
    /// Rows per ranked section.
    pub top_n: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Weekly incident report".to_string(),
            days: 7,
            top_n: 5,
        }
    }
}

/// Complete poller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// IANA time zone for local hours and dates.
    pub timezone: String,
    /// Store settings.
    pub database: DatabaseConfig,
    /// Feed settings.
    pub feed: FeedConfig,
    /// Publishing settings.
    pub publish: PublishConfig,
    /// Report settings.
    pub report: ReportConfig,
    /// Classification table.
    pub classifier: Classifier,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: "America/Chicago".to_string(),
            database: DatabaseConfig::default(),
            feed: FeedConfig::default(),
            publish: PublishConfig::default(),
            report: ReportConfig::default(),
            classifier: Classifier::default(),
        }
    }
}

impl Config {
    /// Loads `path` (or the embedded default) and applies environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or a
    /// value is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let text = match path {
            Some(path) => std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?,
            None => DEFAULT_CONFIG.to_string(),
        };

        let mut config = Self::parse(&text)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;

        log::debug!(
            "Loaded config from {}",
            path.map_or_else(|| "embedded default".to_string(), |p| p.display().to_string())
        );

        Ok(config)
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is invalid.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = lookup(ENV_DB) {
            self.database.path = PathBuf::from(path);
        }
        if let Some(url) = lookup(ENV_FEED_URL) {
            self.feed.url = url;
        }
        if let Some(url) = lookup(ENV_WEBHOOK_URL) {
            self.publish.webhook_url = Some(url);
        }
        if let Some(tz) = lookup(ENV_TIMEZONE) {
            self.timezone = tz;
        }
    }

    /// Checks values that deserialization alone cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tz()?;

        if self.feed.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "feed.poll_interval_secs must be positive".to_string(),
            });
        }
        if self.feed.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "feed.timeout_secs must be positive".to_string(),
            });
        }
        if self.feed.url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "feed.url is empty".to_string(),
            });
        }

        Ok(())
    }

    /// The configured time zone.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Timezone`] if the name is unknown.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Timezone {
                name: self.timezone.clone(),
            })
    }
}
