//! Where rendered messages go.
//!
//! The poll cycle hands a finished text and a [`PublishTarget`] to a
//! [`Publisher`]; posting a new message versus editing an existing one is
//! the publisher's decision based on the target.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors that can occur while publishing.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Webhook answered with a non-success status.
    #[error("Webhook returned HTTP {status}: {body}")]
    Status {
        /// Status code returned.
        status: reqwest::StatusCode,
        /// Response body, for diagnostics.
        body: String,
    },
}

/// Where to place a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishTarget {
    /// Existing message to replace. `None` posts a new message.
    pub message_id: Option<String>,
}

/// What the publisher did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Identifier of the message written, when the channel reports one.
    pub message_id: Option<String>,
}

/// A destination for rendered messages.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Returns a human-readable label for log messages.
    fn label(&self) -> &str;

    /// Publishes `text` at `target`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] if the message could not be delivered.
    async fn publish(&self, text: &str, target: &PublishTarget)
    -> Result<PublishReceipt, PublishError>;
}

/// Prints messages to stdout.
#[derive(Debug, Default)]
pub struct StdoutPublisher;

#[async_trait]
impl Publisher for StdoutPublisher {
    fn label(&self) -> &str {
        "stdout"
    }

    async fn publish(
        &self,
        text: &str,
        _target: &PublishTarget,
    ) -> Result<PublishReceipt, PublishError> {
        println!("{text}");
        println!();
        Ok(PublishReceipt::default())
    }
}

#[derive(Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct WebhookResponse {
    id: Option<String>,
}

/// Posts messages to a chat webhook.
///
/// A new message is a `POST` of `{"content": text}` to the webhook URL; an
/// edit is a `PATCH` of the same body to `{url}/messages/{id}`.
pub struct WebhookPublisher {
    client: reqwest::Client,
    url: String,
}

impl WebhookPublisher {
    /// Creates a publisher for the webhook at `url`.
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
        }
    }

    fn message_url(&self, message_id: &str) -> String {
        format!("{}/messages/{message_id}", self.url)
    }
}

#[async_trait]
impl Publisher for WebhookPublisher {
    fn label(&self) -> &str {
        "webhook"
    }

    async fn publish(
        &self,
        text: &str,
        target: &PublishTarget,
    ) -> Result<PublishReceipt, PublishError> {
        let body = WebhookMessage { content: text };

        let request = match &target.message_id {
            Some(id) => self.client.patch(self.message_url(id)),
            None => self.client.post(&self.url).query(&[("wait", "true")]),
        };

        let resp = request.json(&body).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(PublishError::Status { status, body });
        }

        // Some webhooks answer 204 with no body.
        let message_id = serde_json::from_str::<WebhookResponse>(&body)
            .ok()
            .and_then(|r| r.id)
            .or_else(|| target.message_id.clone());

        Ok(PublishReceipt { message_id })
    }
}

/// Chooses the webhook publisher when a URL is configured, stdout
/// otherwise.
#[must_use]
pub fn from_webhook_url(url: Option<&str>) -> Box<dyn Publisher> {
    match url {
        Some(url) => Box::new(WebhookPublisher::new(url)),
        None => Box::new(StdoutPublisher),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_url_appends_message_id() {
        let publisher = WebhookPublisher::new("https://chat.example/api/webhooks/1/abc/");
        assert_eq!(
            publisher.message_url("42"),
            "https://chat.example/api/webhooks/1/abc/messages/42"
        );
    }

    #[test]
    fn message_body_shape() {
        let json = serde_json::to_string(&WebhookMessage { content: "hi" }).unwrap();
        assert_eq!(json, r#"{"content":"hi"}"#);
    }

    #[test]
    fn publisher_selection() {
        assert_eq!(from_webhook_url(None).label(), "stdout");
        assert_eq!(
            from_webhook_url(Some("https://chat.example/hook")).label(),
            "webhook"
        );
    }

    #[tokio::test]
    async fn stdout_publisher_succeeds() {
        let receipt = StdoutPublisher
            .publish("hello", &PublishTarget::default())
            .await
            .unwrap();
        assert_eq!(receipt, PublishReceipt::default());
    }
}
