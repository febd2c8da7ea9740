use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExpiryError {
    #[error("Monitor type '{0}' has no domain to check")]
    UnsupportedMonitorType(String),

    #[error("Monitor has no target hostname or URL")]
    MissingTarget,

    #[error("Target is an IP address, not a domain: {0}")]
    TargetIsIp(String),

    #[error("Public suffix is incomplete: {0}")]
    SuffixTooShort(String),

    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),

    #[error("WHOIS lookup failed: {0}")]
    WhoisError(String),

    #[error("WHOIS server not found for TLD: {0}")]
    WhoisServerNotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("No expiry date could be determined for domain {domain}")]
    NoExpiry { domain: String },

    #[error("Domain {domain} expired {days} days ago")]
    Expired { domain: String, days: i64 },

    #[error("{0}")]
    Other(String),
}

impl ExpiryError {
    /// Errors meaning the monitor cannot be checked for domain expiry at all,
    /// either permanently or while its target is being edited.
    pub fn is_support_error(&self) -> bool {
        matches!(
            self,
            ExpiryError::UnsupportedMonitorType(_)
                | ExpiryError::MissingTarget
                | ExpiryError::TargetIsIp(_)
                | ExpiryError::SuffixTooShort(_)
                | ExpiryError::InvalidDomain(_)
        )
    }

    /// Input that is expected to be invalid for a while during editing.
    pub fn is_transient_input(&self) -> bool {
        matches!(
            self,
            ExpiryError::TargetIsIp(_) | ExpiryError::SuffixTooShort(_)
        )
    }

    /// Stable key for looking up a translated, user-facing message.
    pub fn message_key(&self) -> &'static str {
        match self {
            ExpiryError::UnsupportedMonitorType(_) => "domain_expiry_unsupported_monitor_type",
            ExpiryError::MissingTarget => "domain_expiry_missing_target",
            ExpiryError::TargetIsIp(_) => "domain_expiry_target_is_ip",
            ExpiryError::SuffixTooShort(_) => "domain_expiry_suffix_too_short",
            ExpiryError::InvalidDomain(_) => "domain_expiry_invalid_domain",
            ExpiryError::NoExpiry { .. } => "domain_expiry_unknown",
            ExpiryError::Expired { .. } => "domain_expiry_expired",
            _ => "domain_expiry_internal_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, ExpiryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_error_grouping() {
        assert!(ExpiryError::MissingTarget.is_support_error());
        assert!(ExpiryError::TargetIsIp("1.1.1.1".into()).is_transient_input());
        assert!(!ExpiryError::MissingTarget.is_transient_input());
        assert!(!ExpiryError::Timeout("x".into()).is_support_error());
    }

    #[test]
    fn test_expired_message() {
        let err = ExpiryError::Expired {
            domain: "example.com".into(),
            days: 3,
        };
        assert_eq!(err.to_string(), "Domain example.com expired 3 days ago");
        assert_eq!(err.message_key(), "domain_expiry_expired");
    }
}
