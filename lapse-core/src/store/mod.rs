//! Durable per-domain expiry state and the settings it depends on.
//!
//! Records are always read and written whole, so an unset field and a field
//! cleared to `None` are the same thing on disk and in memory.

mod memory;
mod migrations;
mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::whois::RegistryInfo;

pub use memory::{MemorySettings, MemoryStore};
pub use migrations::{Migration, MIGRATIONS};
pub use sqlite::SqliteStore;

/// Expiry state for one registrable domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiryRecord {
    domain: String,
    /// Last registry-reported expiration instant.
    pub expiry: Option<DateTime<Utc>>,
    /// When the registry was last queried, whatever the outcome.
    pub last_check: Option<DateTime<Utc>>,
    /// Full parsed registry response from the last answered query.
    pub registry_info: Option<RegistryInfo>,
    /// Smallest threshold in days notified since the last renewal.
    pub last_notification_threshold: Option<u32>,
}

impl ExpiryRecord {
    /// A fresh record with nothing known yet.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            expiry: None,
            last_check: None,
            registry_info: None,
            last_notification_threshold: None,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

#[async_trait]
pub trait ExpiryStore: Send + Sync {
    async fn find(&self, domain: &str) -> Result<Option<ExpiryRecord>>;

    /// Insert or replace the record keyed by its domain.
    async fn save(&self, record: &ExpiryRecord) -> Result<()>;

    /// The stored record, or a new unsaved one.
    async fn find_or_create(&self, domain: &str) -> Result<ExpiryRecord> {
        Ok(self
            .find(domain)
            .await?
            .unwrap_or_else(|| ExpiryRecord::new(domain)))
    }
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_setting(&self, key: &str) -> Result<Option<Value>>;

    async fn set_setting(&self, key: &str, value: Value, category: &str) -> Result<()>;
}
