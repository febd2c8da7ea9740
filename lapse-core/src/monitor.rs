//! Read-only view of the monitors whose targets are checked for expiry.

use serde::{Deserialize, Serialize};

/// Which field of a monitor carries its hostname or URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetField {
    Url,
    Hostname,
}

/// Monitor type discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MonitorType {
    Http,
    Keyword,
    JsonQuery,
    RealBrowser,
    GrpcKeyword,
    Dns,
    Ping,
    Port,
    TailscalePing,
    Smtp,
    Snmp,
    Mqtt,
    Push,
    Docker,
    Group,
    Other(String),
}

impl MonitorType {
    pub fn as_str(&self) -> &str {
        match self {
            MonitorType::Http => "http",
            MonitorType::Keyword => "keyword",
            MonitorType::JsonQuery => "json-query",
            MonitorType::RealBrowser => "real-browser",
            MonitorType::GrpcKeyword => "grpc-keyword",
            MonitorType::Dns => "dns",
            MonitorType::Ping => "ping",
            MonitorType::Port => "port",
            MonitorType::TailscalePing => "tailscale-ping",
            MonitorType::Smtp => "smtp",
            MonitorType::Snmp => "snmp",
            MonitorType::Mqtt => "mqtt",
            MonitorType::Push => "push",
            MonitorType::Docker => "docker",
            MonitorType::Group => "group",
            MonitorType::Other(s) => s,
        }
    }

    /// The field holding a domain-bearing target, if this type has one.
    pub fn target_field(&self) -> Option<TargetField> {
        match self {
            MonitorType::Http
            | MonitorType::Keyword
            | MonitorType::JsonQuery
            | MonitorType::RealBrowser
            | MonitorType::GrpcKeyword => Some(TargetField::Url),
            MonitorType::Dns
            | MonitorType::Ping
            | MonitorType::Port
            | MonitorType::TailscalePing
            | MonitorType::Smtp
            | MonitorType::Snmp
            | MonitorType::Mqtt => Some(TargetField::Hostname),
            MonitorType::Push | MonitorType::Docker | MonitorType::Group | MonitorType::Other(_) => {
                None
            }
        }
    }
}

impl From<&str> for MonitorType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "http" => MonitorType::Http,
            "keyword" => MonitorType::Keyword,
            "json-query" => MonitorType::JsonQuery,
            "real-browser" => MonitorType::RealBrowser,
            "grpc-keyword" => MonitorType::GrpcKeyword,
            "dns" => MonitorType::Dns,
            "ping" => MonitorType::Ping,
            "port" => MonitorType::Port,
            "tailscale-ping" => MonitorType::TailscalePing,
            "smtp" => MonitorType::Smtp,
            "snmp" => MonitorType::Snmp,
            "mqtt" => MonitorType::Mqtt,
            "push" => MonitorType::Push,
            "docker" => MonitorType::Docker,
            "group" => MonitorType::Group,
            other => MonitorType::Other(other.to_string()),
        }
    }
}

impl From<String> for MonitorType {
    fn from(s: String) -> Self {
        MonitorType::from(s.as_str())
    }
}

impl From<MonitorType> for String {
    fn from(t: MonitorType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for MonitorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monitor {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub monitor_type: MonitorType,
    pub url: Option<String>,
    pub hostname: Option<String>,
}

impl Monitor {
    pub fn new(id: i64, name: impl Into<String>, monitor_type: MonitorType) -> Self {
        Self {
            id,
            name: name.into(),
            monitor_type,
            url: None,
            hostname: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// The target string for this monitor's type, `None` if the type has no
    /// domain-bearing field or the field is unset.
    pub fn target(&self) -> Option<&str> {
        match self.monitor_type.target_field()? {
            TargetField::Url => self.url.as_deref(),
            TargetField::Hostname => self.hostname.as_deref(),
        }
    }
}
