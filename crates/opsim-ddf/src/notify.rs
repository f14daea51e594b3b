//! Completion notifications.
//!
//! The notifier is an injected collaborator with process-wide lifetime;
//! the driver never constructs one itself, so tests substitute
//! [`crate::fakes::RecordingNotifier`].

use crate::error::Result;
use async_trait::async_trait;
use tracing::debug;

/// Outbound push notification channel (message-only, no payload).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
}

/// Notifier that drops every message. Wired when no endpoint is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        debug!(message = %message, "notification suppressed (no endpoint configured)");
        Ok(())
    }
}

/// Push notifier posting the plain-text message to a channel endpoint
/// (notify.run protocol).
pub struct HttpNotifier {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        HttpNotifier {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .body(message.to_string())
            .send()
            .await?;
        response.error_for_status()?;
        debug!(endpoint = %self.endpoint, "notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_notifier_accepts_messages() {
        let notifier = NoopNotifier;
        notifier.send("Done with DDF metrics for FBS_v1.5!").await.expect("send");
    }
}
