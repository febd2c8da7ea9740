use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info, instrument, warn};

use super::migrations::{latest_version, MIGRATIONS};
use super::{ExpiryRecord, ExpiryStore, SettingsStore};
use crate::error::{ExpiryError, Result};
use crate::whois::RegistryInfo;

const MAX_CONNECTIONS: u32 = 5;

/// SQLite-backed record and settings store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url`, e.g. `sqlite://lapse.db`.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // Every connection to an in-memory database sees its own database
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .connect_with(options)
                .await?
        };

        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn schema_version(&self) -> Result<i64> {
        let row = sqlx::query("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    /// Apply every pending migration, returning the resulting version.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<i64> {
        let current = self.schema_version().await?;

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            let mut tx = self.pool.begin().await?;
            for statement in migration.up {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
            sqlx::query(&format!("PRAGMA user_version = {}", migration.version))
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            info!(version = migration.version, description = migration.description, "Applied migration");
        }

        Ok(current.max(latest_version()))
    }

    /// Reverse migrations newer than `version`, newest first.
    #[instrument(skip(self))]
    pub async fn rollback_to(&self, version: i64) -> Result<i64> {
        if version < 0 {
            return Err(ExpiryError::Other(format!(
                "Invalid schema version: {}",
                version
            )));
        }
        let current = self.schema_version().await?;

        for migration in MIGRATIONS
            .iter()
            .rev()
            .filter(|m| m.version > version && m.version <= current)
        {
            let mut tx = self.pool.begin().await?;
            for statement in migration.down {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
            sqlx::query(&format!("PRAGMA user_version = {}", migration.version - 1))
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            info!(version = migration.version, "Reverted migration");
        }

        self.schema_version().await
    }
}

fn format_timestamp(ts: &Option<DateTime<Utc>>) -> Option<String> {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn parse_timestamp(column: &str, raw: Option<String>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            warn!(column = column, value = %raw, error = %e, "Ignoring unreadable timestamp");
            None
        }
    }
}

fn parse_registry_info(raw: Option<String>) -> Option<RegistryInfo> {
    let raw = raw?;
    match serde_json::from_str(&raw) {
        Ok(info) => Some(info),
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable whois_info");
            None
        }
    }
}

fn record_from_row(row: &SqliteRow) -> Result<ExpiryRecord> {
    let mut record = ExpiryRecord::new(row.try_get::<String, _>("domain")?);
    record.expiry = parse_timestamp("expiry", row.try_get("expiry")?);
    record.last_check = parse_timestamp("last_check", row.try_get("last_check")?);
    record.last_notification_threshold = row
        .try_get::<Option<i64>, _>("last_expiry_notification_sent")?
        .and_then(|t| u32::try_from(t).ok());
    record.registry_info = parse_registry_info(row.try_get("whois_info")?);
    Ok(record)
}

#[async_trait]
impl ExpiryStore for SqliteStore {
    async fn find(&self, domain: &str) -> Result<Option<ExpiryRecord>> {
        let row = sqlx::query(
            "SELECT domain, expiry, last_check, last_expiry_notification_sent, whois_info \
             FROM domain_expiry WHERE domain = ?",
        )
        .bind(domain)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn save(&self, record: &ExpiryRecord) -> Result<()> {
        let whois_info = record
            .registry_info
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO domain_expiry (domain, expiry, last_check, last_expiry_notification_sent, whois_info)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(domain) DO UPDATE SET
                expiry = excluded.expiry,
                last_check = excluded.last_check,
                last_expiry_notification_sent = excluded.last_expiry_notification_sent,
                whois_info = excluded.whois_info
            "#,
        )
        .bind(record.domain())
        .bind(format_timestamp(&record.expiry))
        .bind(format_timestamp(&record.last_check))
        .bind(record.last_notification_threshold.map(i64::from))
        .bind(whois_info)
        .execute(&self.pool)
        .await?;

        debug!(domain = %record.domain(), "Saved expiry record");
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn get_setting(&self, key: &str) -> Result<Option<Value>> {
        let row = sqlx::query("SELECT value FROM setting WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(raw) = row
            .map(|r| r.try_get::<Option<String>, _>("value"))
            .transpose()?
            .flatten()
        else {
            return Ok(None);
        };

        // Values written by hand may not be JSON
        Ok(Some(
            serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        ))
    }

    async fn set_setting(&self, key: &str, value: Value, category: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO setting (key, value, type) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, type = excluded.type
            "#,
        )
        .bind(key)
        .bind(serde_json::to_string(&value)?)
        .bind(category)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
