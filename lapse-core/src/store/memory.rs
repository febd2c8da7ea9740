use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{ExpiryRecord, ExpiryStore, SettingsStore};
use crate::error::Result;

/// Process-local record store, for tests and one-shot CLI runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, ExpiryRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ExpiryStore for MemoryStore {
    async fn find(&self, domain: &str) -> Result<Option<ExpiryRecord>> {
        Ok(self.records.read().await.get(domain).cloned())
    }

    async fn save(&self, record: &ExpiryRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.domain().to_string(), record.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, (Value, String)>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Category the setting was stored under.
    pub async fn category(&self, key: &str) -> Option<String> {
        self.values.read().await.get(key).map(|(_, c)| c.clone())
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn get_setting(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.read().await.get(key).map(|(v, _)| v.clone()))
    }

    async fn set_setting(&self, key: &str, value: Value, category: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), (value, category.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_find_or_create_does_not_persist() {
        let store = MemoryStore::new();
        let record = store.find_or_create("example.com").await.unwrap();
        assert_eq!(record.domain(), "example.com");
        assert!(record.expiry.is_none());
        assert!(store.is_empty().await);

        store.save(&record).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.find("example.com").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let settings = MemorySettings::new();
        assert!(settings.get_setting("missing").await.unwrap().is_none());

        settings
            .set_setting("domainExpiryNotifyDays", json!([1, 2]), "general")
            .await
            .unwrap();
        assert_eq!(
            settings.get_setting("domainExpiryNotifyDays").await.unwrap(),
            Some(json!([1, 2]))
        );
        assert_eq!(
            settings.category("domainExpiryNotifyDays").await.as_deref(),
            Some("general")
        );
    }
}
