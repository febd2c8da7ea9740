//! Notification providers the threshold engine dispatches to.
//!
//! Delivery protocols live behind [`NotificationProvider`]; the engine only
//! needs to know whether a send succeeded.

mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;

pub use webhook::WebhookProvider;

#[async_trait]
pub trait NotificationProvider: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
}

/// A configured provider, as listed on a monitor.
#[derive(Clone)]
pub struct Notification {
    pub name: String,
    pub provider: Arc<dyn NotificationProvider>,
}

impl Notification {
    pub fn new(name: impl Into<String>, provider: Arc<dyn NotificationProvider>) -> Self {
        Self {
            name: name.into(),
            provider,
        }
    }
}

impl std::fmt::Debug for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notification")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProvider;

#[async_trait]
impl NotificationProvider for LogProvider {
    async fn send(&self, message: &str) -> Result<()> {
        info!(message = %message, "Domain expiry notification");
        Ok(())
    }
}
