//! Notification threshold selection.
//!
//! Thresholds are walked smallest first and at most one fires per cycle, so a
//! domain that crossed several windows between checks gets a single warning
//! for the tightest one.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::notify::Notification;
use crate::store::{ExpiryRecord, SettingsStore};

pub const NOTIFY_DAYS_SETTING: &str = "domainExpiryNotifyDays";
pub const DEFAULT_NOTIFY_DAYS: [u32; 3] = [7, 14, 21];
const SETTING_CATEGORY: &str = "general";

/// Whole days from `now` until `expiry`, truncated toward zero.
pub fn days_remaining(expiry: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expiry - now).num_days()
}

pub fn notification_message(domain: &str, days: i64) -> String {
    match days {
        d if d < 0 => format!("Domain {} expired {} days ago", domain, -d),
        0 => format!("Domain {} expires today", domain),
        1 => format!("Domain {} will expire in 1 day", domain),
        d => format!("Domain {} will expire in {} days", domain, d),
    }
}

fn parse_thresholds(value: &Value) -> Option<Vec<u32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_u64().and_then(|n| u32::try_from(n).ok()))
        .collect()
}

/// Configured thresholds, ascending and without duplicates.
///
/// A missing or malformed setting is replaced by [`DEFAULT_NOTIFY_DAYS`],
/// which is written back so the settings page shows what is in effect.
pub async fn load_thresholds(settings: &dyn SettingsStore) -> Result<Vec<u32>> {
    let configured = settings
        .get_setting(NOTIFY_DAYS_SETTING)
        .await?
        .and_then(|value| parse_thresholds(&value));

    let mut thresholds = match configured {
        Some(thresholds) => thresholds,
        None => {
            debug!("No valid expiry thresholds configured, using defaults");
            settings
                .set_setting(
                    NOTIFY_DAYS_SETTING,
                    Value::from(DEFAULT_NOTIFY_DAYS.to_vec()),
                    SETTING_CATEGORY,
                )
                .await?;
            DEFAULT_NOTIFY_DAYS.to_vec()
        }
    };

    thresholds.sort_unstable();
    thresholds.dedup();
    Ok(thresholds)
}

/// Send `message` to every provider at once; true if any accepted it.
async fn dispatch(notifications: &[Notification], message: &str) -> bool {
    let results = join_all(
        notifications
            .iter()
            .map(|n| async move { (n, n.provider.send(message).await) }),
    )
    .await;

    let mut delivered = false;
    for (notification, result) in results {
        match result {
            Ok(()) => delivered = true,
            Err(e) => warn!(provider = %notification.name, error = %e, "Failed to send expiry notification"),
        }
    }
    delivered
}

/// Fire the smallest due threshold not yet covered since the last renewal.
///
/// `thresholds` must be sorted ascending. On success the record's
/// `last_notification_threshold` is updated (the caller persists it) and the
/// threshold is returned.
pub async fn evaluate(
    record: &mut ExpiryRecord,
    thresholds: &[u32],
    notifications: &[Notification],
    now: DateTime<Utc>,
) -> Option<u32> {
    if notifications.is_empty() {
        return None;
    }
    let expiry = record.expiry?;
    let days = days_remaining(expiry, now);

    for &threshold in thresholds {
        if days > i64::from(threshold) {
            continue;
        }
        if record
            .last_notification_threshold
            .is_some_and(|sent| sent <= threshold)
        {
            continue;
        }

        let message = notification_message(record.domain(), days);
        if dispatch(notifications, &message).await {
            info!(domain = %record.domain(), threshold, days, "Sent domain expiry notification");
            record.last_notification_threshold = Some(threshold);
            return Some(threshold);
        }
        warn!(domain = %record.domain(), threshold, "No provider accepted the expiry notification");
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySettings;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_days_remaining_truncates() {
        let expiry = Utc.with_ymd_and_hms(2030, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(
            days_remaining(expiry, Utc.with_ymd_and_hms(2030, 4, 20, 0, 0, 0).unwrap()),
            11
        );
        assert_eq!(
            days_remaining(expiry, Utc.with_ymd_and_hms(2030, 4, 20, 12, 0, 0).unwrap()),
            10
        );
        assert_eq!(
            days_remaining(expiry, Utc.with_ymd_and_hms(2030, 5, 3, 0, 0, 0).unwrap()),
            -2
        );
    }

    #[test]
    fn test_notification_message() {
        assert_eq!(
            notification_message("example.com", 11),
            "Domain example.com will expire in 11 days"
        );
        assert_eq!(
            notification_message("example.com", 1),
            "Domain example.com will expire in 1 day"
        );
        assert_eq!(notification_message("example.com", 0), "Domain example.com expires today");
        assert_eq!(
            notification_message("example.com", -4),
            "Domain example.com expired 4 days ago"
        );
    }

    #[test]
    fn test_parse_thresholds() {
        assert_eq!(parse_thresholds(&json!([21, 7, 14])), Some(vec![21, 7, 14]));
        assert_eq!(parse_thresholds(&json!([])), Some(vec![]));
        assert_eq!(parse_thresholds(&json!([7, "14"])), None);
        assert_eq!(parse_thresholds(&json!([-1])), None);
        assert_eq!(parse_thresholds(&json!("7,14")), None);
        assert_eq!(parse_thresholds(&Value::Null), None);
    }

    #[tokio::test]
    async fn test_load_thresholds_defaults_and_persists() {
        let settings = MemorySettings::new();
        assert_eq!(load_thresholds(&settings).await.unwrap(), vec![7, 14, 21]);
        assert_eq!(
            settings.get_setting(NOTIFY_DAYS_SETTING).await.unwrap(),
            Some(json!([7, 14, 21]))
        );
        assert_eq!(
            settings.category(NOTIFY_DAYS_SETTING).await.as_deref(),
            Some("general")
        );
    }

    #[tokio::test]
    async fn test_load_thresholds_replaces_invalid_value() {
        let settings = MemorySettings::new();
        settings
            .set_setting(NOTIFY_DAYS_SETTING, json!({"days": 3}), "general")
            .await
            .unwrap();
        assert_eq!(load_thresholds(&settings).await.unwrap(), vec![7, 14, 21]);
        assert_eq!(
            settings.get_setting(NOTIFY_DAYS_SETTING).await.unwrap(),
            Some(json!([7, 14, 21]))
        );
    }

    #[tokio::test]
    async fn test_load_thresholds_sorts_configured() {
        let settings = MemorySettings::new();
        settings
            .set_setting(NOTIFY_DAYS_SETTING, json!([30, 1, 30, 10]), "general")
            .await
            .unwrap();
        assert_eq!(load_thresholds(&settings).await.unwrap(), vec![1, 10, 30]);
    }
}
