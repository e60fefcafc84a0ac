//! HTTP implementation of [`IncidentFeed`].

use std::time::Duration;

use async_trait::async_trait;
use incident_watch_incident_models::Incident;

use crate::{FeedError, FieldMapping, IncidentFeed, normalize, retry};

/// Fetches the active-incident list from a JSON endpoint.
pub struct HttpFeed {
    client: reqwest::Client,
    url: String,
    mapping: FieldMapping,
}

impl HttpFeed {
    /// Creates a feed for `url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the HTTP client cannot be built.
    pub fn new(url: &str, mapping: FieldMapping, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("incident_watch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
            mapping,
        })
    }
}

#[async_trait]
impl IncidentFeed for HttpFeed {
    fn label(&self) -> &str {
        &self.url
    }

    async fn poll(&self) -> Result<Vec<Incident>, FeedError> {
        log::debug!("Fetching feed: {}", self.url);
        let body = retry::send_text(|| self.client.get(&self.url)).await?;
        let incidents = normalize(&body, &self.mapping)?;
        log::debug!("Feed returned {} incidents", incidents.len());
        Ok(incidents)
    }
}
