use serde::Serialize;
use serde_json::json;

use super::OutputFormatter;
use crate::check::Heartbeat;
use crate::error::ExpiryError;
use crate::store::ExpiryRecord;
use crate::validation::DomainSupport;
use crate::whois::Extraction;

pub struct JsonFormatter {
    pretty: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> String {
        if self.pretty {
            serde_json::to_string_pretty(value)
                .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        } else {
            serde_json::to_string(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_heartbeat(&self, heartbeat: &Heartbeat) -> String {
        self.to_json(heartbeat)
    }

    fn format_extraction(&self, domain: &str, extraction: &Extraction) -> String {
        self.to_json(&json!({
            "domain": domain,
            "expiry_date": extraction.expiry_date,
            "registry_info": extraction.registry_info,
        }))
    }

    fn format_support(&self, support: &DomainSupport) -> String {
        self.to_json(support)
    }

    fn format_record(&self, record: &ExpiryRecord) -> String {
        self.to_json(record)
    }

    fn format_error(&self, error: &ExpiryError) -> String {
        self.to_json(&json!({
            "error": error.to_string(),
            "key": error.message_key(),
        }))
    }
}
