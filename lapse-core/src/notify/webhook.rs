use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::NotificationProvider;
use crate::error::{ExpiryError, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    msg: &'a str,
}

/// Posts `{"msg": ...}` as JSON to a URL; any non-2xx answer is a failure.
#[derive(Debug, Clone)]
pub struct WebhookProvider {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl WebhookProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl NotificationProvider for WebhookProvider {
    async fn send(&self, message: &str) -> Result<()> {
        debug!(url = %self.url, "Posting webhook notification");

        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .header("User-Agent", "lapse/0.1.0")
            .json(&WebhookPayload { msg: message })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExpiryError::Notification(format!(
                "Webhook {} returned status {}",
                self.url, status
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_webhook_posts_message() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/hook")
                    .json_body(json!({"msg": "Domain example.com will expire in 7 days"}));
                then.status(200);
            })
            .await;

        let provider = WebhookProvider::new(server.url("/hook"));
        provider
            .send("Domain example.com will expire in 7 days")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_webhook_error_status_fails() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/hook");
                then.status(500);
            })
            .await;

        let provider = WebhookProvider::new(server.url("/hook"));
        let err = provider.send("hello").await.unwrap_err();
        assert!(matches!(err, ExpiryError::Notification(_)));
    }
}
