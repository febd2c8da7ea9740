pub mod check;
pub mod clock;
pub mod colors;
pub mod error;
pub mod expiry;
pub mod lock;
pub mod monitor;
pub mod notify;
pub mod output;
pub mod store;
pub mod validation;
pub mod whois;

pub use error::{ExpiryError, Result};
pub use validation::{check_support, derive_support, normalize, DomainSupport};

pub use check::{DomainExpiryCheck, Heartbeat, HeartbeatStatus, MonitorCheck};
pub use clock::{Clock, FixedClock, SystemClock};
pub use expiry::DomainExpiry;
pub use monitor::{Monitor, MonitorType};
pub use notify::{LogProvider, Notification, NotificationProvider, WebhookProvider};
pub use store::{ExpiryRecord, ExpiryStore, MemorySettings, MemoryStore, SettingsStore, SqliteStore};
pub use whois::{RegistryClient, WhoisClient};

pub use output::{OutputFormat, OutputFormatter};
