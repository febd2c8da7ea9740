//! Per-domain expiry tracking: registry throttling, renewal detection and
//! threshold notifications.

pub mod thresholds;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::lock::KeyedLocks;
use crate::monitor::Monitor;
use crate::notify::Notification;
use crate::store::{ExpiryRecord, ExpiryStore, SettingsStore};
use crate::validation::{self, DomainSupport};
use crate::whois::{self, RegistryClient};

pub use thresholds::{days_remaining, DEFAULT_NOTIFY_DAYS, NOTIFY_DAYS_SETTING};

/// Minimum whole days between two registry queries for one domain.
pub const RECHECK_INTERVAL_DAYS: i64 = 1;

/// Exclusive access to one domain's record; dropped to release.
pub type DomainGuard = OwnedMutexGuard<()>;

pub struct DomainExpiry {
    store: Arc<dyn ExpiryStore>,
    settings: Arc<dyn SettingsStore>,
    registry: Arc<dyn RegistryClient>,
    clock: Arc<dyn Clock>,
    locks: KeyedLocks<String>,
}

impl DomainExpiry {
    pub fn new(
        store: Arc<dyn ExpiryStore>,
        settings: Arc<dyn SettingsStore>,
        registry: Arc<dyn RegistryClient>,
    ) -> Self {
        Self {
            store,
            settings,
            registry,
            clock: Arc::new(SystemClock),
            locks: KeyedLocks::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Registrable domain and TLD for a monitor, or why it has none.
    pub fn check_support(&self, monitor: &Monitor) -> Result<DomainSupport> {
        validation::check_support(monitor)
    }

    /// Stored record for `domain`, or a fresh unsaved one.
    pub async fn find_or_create(&self, domain: &str) -> Result<ExpiryRecord> {
        self.store.find_or_create(domain).await
    }

    /// Wait for exclusive access to `domain`.
    ///
    /// Hold the guard across [`check_expiry_locked`](Self::check_expiry_locked)
    /// and [`send_notifications_locked`](Self::send_notifications_locked) to run
    /// a whole cycle without another check interleaving.
    pub async fn lock(&self, domain: &str) -> DomainGuard {
        self.locks.lock(&domain.to_string()).await
    }

    /// Current expiry for `domain`, querying the registry at most once a day.
    ///
    /// Returns `None` when a fresh query produced no usable date. Only storage
    /// failures are errors; registry trouble is absorbed.
    #[instrument(skip(self))]
    pub async fn check_expiry(&self, domain: &str) -> Result<Option<DateTime<Utc>>> {
        let _guard = self.lock(domain).await;
        self.check_expiry_locked(domain).await
    }

    /// [`check_expiry`](Self::check_expiry) for a caller already holding the
    /// domain's guard.
    pub async fn check_expiry_locked(&self, domain: &str) -> Result<Option<DateTime<Utc>>> {
        let mut record = self.store.find_or_create(domain).await?;
        let now = self.now();

        if let Some(last_check) = record.last_check {
            if (now - last_check).num_days() < RECHECK_INTERVAL_DAYS {
                debug!(last_check = %last_check, "Checked recently, using stored expiry");
                return Ok(record.expiry);
            }
        }

        let answer = self.registry.query(domain).await;
        let extraction = answer.as_deref().map(whois::extract);
        let expiry_date = extraction.as_ref().and_then(|e| e.expiry_date);

        if let Some(new_expiry) = expiry_date {
            if record.expiry.is_some_and(|previous| new_expiry > previous) {
                info!(
                    previous = ?record.expiry,
                    expiry = %new_expiry,
                    "Domain renewed, resetting notification state"
                );
                record.last_notification_threshold = None;
            }
            record.expiry = Some(new_expiry);
        } else {
            debug!(answered = answer.is_some(), "No expiry date in registry response");
        }

        record.last_check = Some(now);
        if let Some(extraction) = extraction {
            record.registry_info = Some(extraction.registry_info);
        }
        self.store.save(&record).await?;

        Ok(expiry_date)
    }

    /// Notify for the smallest newly crossed threshold, if any.
    ///
    /// Returns the threshold that was sent. With no providers, or no stored
    /// expiry, nothing happens.
    #[instrument(skip(self, notifications), fields(providers = notifications.len()))]
    pub async fn send_notifications(
        &self,
        domain: &str,
        notifications: &[Notification],
    ) -> Result<Option<u32>> {
        let _guard = self.lock(domain).await;
        self.send_notifications_locked(domain, notifications).await
    }

    /// [`send_notifications`](Self::send_notifications) for a caller already
    /// holding the domain's guard.
    pub async fn send_notifications_locked(
        &self,
        domain: &str,
        notifications: &[Notification],
    ) -> Result<Option<u32>> {
        if notifications.is_empty() {
            return Ok(None);
        }

        let mut record = self.store.find_or_create(domain).await?;
        if record.expiry.is_none() {
            warn!(domain = %domain, "Asked to notify for a domain without a known expiry");
            return Ok(None);
        }

        let thresholds = thresholds::load_thresholds(self.settings.as_ref()).await?;
        let sent = thresholds::evaluate(&mut record, &thresholds, notifications, self.now()).await;

        if sent.is_some() {
            self.store.save(&record).await?;
        }
        Ok(sent)
    }
}
