//! Target normalization and registrable-domain derivation

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::{Host, Url};

use crate::error::{ExpiryError, Result};
use crate::monitor::{Monitor, MonitorType};

/// Minimum public suffix length accepted before the target is treated as
/// still being typed.
const MIN_SUFFIX_LEN: usize = 2;

/// A monitor target reduced to the domain that is registered with a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSupport {
    /// Registrable domain, e.g. `example.co.uk`
    pub domain: String,
    /// Last label of the public suffix, e.g. `uk`
    pub tld: String,
}

/// Extract the hostname from a URL or bare host
///
/// This function:
/// - Parses the input as a URL
/// - Retries with `https://` prefixed when that fails or finds no host
/// - Converts to lowercase and strips a trailing root dot
/// - Returns IPv6 literals without brackets
/// - Returns an empty string when no host can be found
pub fn normalize(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let parsed = Url::parse(raw)
        .ok()
        .filter(|url| url.host().is_some())
        .or_else(|| Url::parse(&format!("https://{}", raw)).ok());

    let Some(url) = parsed else {
        return String::new();
    };

    match url.host() {
        Some(Host::Domain(domain)) => domain.trim_end_matches('.').to_lowercase(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        None => String::new(),
    }
}

/// Derive the registrable domain and root TLD for a monitor type and target
///
/// Fails with:
/// - `UnsupportedMonitorType` when the type has no domain-bearing field
/// - `MissingTarget` when the target is absent or blank
/// - `TargetIsIp` when the host is an IP literal
/// - `SuffixTooShort` when the public suffix is a single character
/// - `InvalidDomain` when no registrable domain exists
pub fn derive_support(monitor_type: &MonitorType, target: Option<&str>) -> Result<DomainSupport> {
    if monitor_type.target_field().is_none() {
        return Err(ExpiryError::UnsupportedMonitorType(
            monitor_type.as_str().to_string(),
        ));
    }

    let target = target
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ExpiryError::MissingTarget)?;

    let host = normalize(target);
    if host.is_empty() {
        return Err(ExpiryError::MissingTarget);
    }

    if host.parse::<IpAddr>().is_ok() {
        return Err(ExpiryError::TargetIsIp(host));
    }

    let name = addr::parse_domain_name(&host)
        .map_err(|e| ExpiryError::InvalidDomain(format!("{}: {}", host, e)))?;

    let suffix = name.suffix();
    if suffix.len() < MIN_SUFFIX_LEN {
        // Expected while a hostname is being typed, not worth more than debug
        debug!(host = %host, suffix = %suffix, "Public suffix too short");
        return Err(ExpiryError::SuffixTooShort(host.clone()));
    }

    let domain = name
        .root()
        .ok_or_else(|| ExpiryError::InvalidDomain(host.clone()))?
        .to_string();

    let tld = suffix.rsplit('.').next().unwrap_or(suffix).to_string();

    Ok(DomainSupport { domain, tld })
}

/// Resolve a monitor's target field and derive its registrable domain.
pub fn check_support(monitor: &Monitor) -> Result<DomainSupport> {
    derive_support(&monitor.monitor_type, monitor.target())
}
