use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::errors::NotifyError;

/// Best-effort outbound alert delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_alert(&self, destination: &str, message: &str) -> Result<(), NotifyError>;
}

/// Posts `{destination, message}` as JSON to a webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_alert(&self, destination: &str, message: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "destination": destination,
                "message": message
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }

        Ok(())
    }
}

/// Used when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_alert(&self, destination: &str, message: &str) -> Result<(), NotifyError> {
        tracing::warn!(destination, "{}", message);
        Ok(())
    }
}
