//! Monitor-facing entry point: one check turns into one heartbeat.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{ExpiryError, Result};
use crate::expiry::{days_remaining, DomainExpiry};
use crate::monitor::Monitor;
use crate::notify::Notification;

/// Failed checks surface as errors, so a heartbeat is always up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartbeatStatus {
    Up,
}

/// Outcome of a successful check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heartbeat {
    pub status: HeartbeatStatus,
    pub msg: String,
    pub domain: String,
    pub days_remaining: i64,
    pub expiry: DateTime<Utc>,
}

#[async_trait]
pub trait MonitorCheck: Send + Sync {
    async fn check(&self, monitor: &Monitor) -> Result<Heartbeat>;
}

/// Checks a monitor's domain registration and notifies as thresholds pass.
pub struct DomainExpiryCheck {
    service: Arc<DomainExpiry>,
    notifications: Vec<Notification>,
    timeout: Option<Duration>,
}

impl DomainExpiryCheck {
    pub fn new(service: Arc<DomainExpiry>, notifications: Vec<Notification>) -> Self {
        Self {
            service,
            notifications,
            timeout: None,
        }
    }

    /// Fail the whole check with [`ExpiryError::Timeout`] after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn run(&self, monitor: &Monitor) -> Result<Heartbeat> {
        let support = self.service.check_support(monitor)?;
        let domain = support.domain;

        let _guard = self.service.lock(&domain).await;
        let expiry = self.service.check_expiry_locked(&domain).await?;
        self.service
            .send_notifications_locked(&domain, &self.notifications)
            .await?;

        let Some(expiry) = expiry else {
            return Err(ExpiryError::NoExpiry { domain });
        };

        let days = days_remaining(expiry, self.service.now());
        if days < 0 {
            return Err(ExpiryError::Expired { domain, days: -days });
        }

        debug!(domain = %domain, days, "Domain registration is current");
        Ok(Heartbeat {
            status: HeartbeatStatus::Up,
            msg: format!(
                "Domain {} expires in {} days ({})",
                domain,
                days,
                expiry.format("%Y-%m-%d")
            ),
            domain,
            days_remaining: days,
            expiry,
        })
    }
}

#[async_trait]
impl MonitorCheck for DomainExpiryCheck {
    #[instrument(skip(self, monitor), fields(monitor = %monitor.name))]
    async fn check(&self, monitor: &Monitor) -> Result<Heartbeat> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(monitor))
                .await
                .map_err(|_| {
                    ExpiryError::Timeout(format!("Domain expiry check exceeded {:?}", limit))
                })?,
            None => self.run(monitor).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::monitor::MonitorType;
    use crate::notify::NotificationProvider;
    use crate::store::{ExpiryStore, MemorySettings, MemoryStore};
    use crate::whois::RegistryClient;
    use chrono::TimeZone;
    use std::sync::Mutex;

    struct StaticRegistry {
        response: Option<&'static str>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl RegistryClient for StaticRegistry {
        async fn query(&self, _domain: &str) -> Option<String> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.response.map(String::from)
        }
    }

    #[derive(Default)]
    struct Inbox(Mutex<Vec<String>>);

    #[async_trait]
    impl NotificationProvider for Inbox {
        async fn send(&self, message: &str) -> Result<()> {
            self.0.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn service(
        response: Option<&'static str>,
        now: DateTime<Utc>,
    ) -> (Arc<DomainExpiry>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(StaticRegistry {
            response,
            delay: None,
        });
        let service = DomainExpiry::new(store.clone(), Arc::new(MemorySettings::new()), registry)
            .with_clock(Arc::new(FixedClock::new(now)));
        (Arc::new(service), store)
    }

    fn http_monitor(url: &str) -> Monitor {
        Monitor::new(1, "site", MonitorType::from("http")).with_url(url)
    }

    #[tokio::test]
    async fn test_check_reports_days_remaining() {
        let (service, store) = service(
            Some("Registry Expiry Date: 2030-05-01T00:00:00Z\n"),
            utc(2030, 4, 20),
        );
        let inbox = Arc::new(Inbox::default());
        let check = DomainExpiryCheck::new(service, vec![Notification::new("inbox", inbox.clone())]);

        let heartbeat = check
            .check(&http_monitor("https://www.example.com/login"))
            .await
            .unwrap();

        assert_eq!(heartbeat.status, HeartbeatStatus::Up);
        assert_eq!(heartbeat.domain, "example.com");
        assert_eq!(heartbeat.days_remaining, 11);
        assert_eq!(heartbeat.msg, "Domain example.com expires in 11 days (2030-05-01)");

        // 11 days is only inside the 14 and 21 day windows; 14 is the smallest
        assert_eq!(
            *inbox.0.lock().unwrap(),
            vec!["Domain example.com will expire in 11 days".to_string()]
        );
        let record = store.find("example.com").await.unwrap().unwrap();
        assert_eq!(record.last_notification_threshold, Some(14));
    }

    #[tokio::test]
    async fn test_check_expired_domain_fails() {
        let (service, _) = service(
            Some("Registry Expiry Date: 2020-01-01T00:00:00Z\n"),
            utc(2020, 1, 11),
        );
        let check = DomainExpiryCheck::new(service, Vec::new());

        let err = check
            .check(&http_monitor("https://example.com"))
            .await
            .unwrap_err();
        match err {
            ExpiryError::Expired { domain, days } => {
                assert_eq!(domain, "example.com");
                assert_eq!(days, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_check_without_expiry_fails() {
        let (service, _) = service(Some("domain: example.com\n"), utc(2030, 4, 20));
        let check = DomainExpiryCheck::new(service, Vec::new());

        let err = check
            .check(&http_monitor("https://example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExpiryError::NoExpiry { ref domain } if domain == "example.com"));
    }

    #[tokio::test]
    async fn test_check_unsupported_monitor() {
        let (service, store) = service(None, utc(2030, 4, 20));
        let check = DomainExpiryCheck::new(service, Vec::new());

        let push = Monitor::new(2, "push", MonitorType::from("push"));
        let err = check.check(&push).await.unwrap_err();
        assert!(matches!(err, ExpiryError::UnsupportedMonitorType(_)));

        let ip = http_monitor("http://192.168.1.10:8080/");
        let err = check.check(&ip).await.unwrap_err();
        assert!(matches!(err, ExpiryError::TargetIsIp(_)));

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_check_times_out() {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(StaticRegistry {
            response: Some("Registry Expiry Date: 2030-05-01T00:00:00Z\n"),
            delay: Some(Duration::from_secs(5)),
        });
        let service = DomainExpiry::new(store, Arc::new(MemorySettings::new()), registry);
        let check = DomainExpiryCheck::new(Arc::new(service), Vec::new())
            .with_timeout(Duration::from_millis(20));

        let err = check
            .check(&http_monitor("https://example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExpiryError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_concurrent_checks_notify_once() {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(StaticRegistry {
            response: Some("Registry Expiry Date: 2030-05-01T00:00:00Z\n"),
            delay: Some(Duration::from_millis(20)),
        });
        let service = DomainExpiry::new(store.clone(), Arc::new(MemorySettings::new()), registry)
            .with_clock(Arc::new(FixedClock::new(utc(2030, 4, 25))));
        let inbox = Arc::new(Inbox::default());
        let check = Arc::new(DomainExpiryCheck::new(
            Arc::new(service),
            vec![Notification::new("inbox", inbox.clone())],
        ));

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let check = check.clone();
                tokio::spawn(async move {
                    check
                        .check(&http_monitor("https://www.example.com/"))
                        .await
                        .unwrap()
                })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().days_remaining, 6);
        }

        assert_eq!(
            *inbox.0.lock().unwrap(),
            vec!["Domain example.com will expire in 6 days".to_string()]
        );
        let record = store.find("example.com").await.unwrap().unwrap();
        assert_eq!(record.last_notification_threshold, Some(7));
    }
}
