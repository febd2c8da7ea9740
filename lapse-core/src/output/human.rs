use chrono::{DateTime, Utc};
use colored::Colorize;

use super::OutputFormatter;
use crate::check::{Heartbeat, HeartbeatStatus};
use crate::colors::CatppuccinExt;
use crate::error::ExpiryError;
use crate::store::ExpiryRecord;
use crate::validation::DomainSupport;
use crate::whois::Extraction;

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub struct HumanFormatter {
    use_colors: bool,
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    fn label(&self, text: &str) -> String {
        if self.use_colors {
            text.sky().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn value(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_white().to_string()
        } else {
            text.to_string()
        }
    }

    fn muted(&self, text: &str) -> String {
        if self.use_colors {
            text.overlay0().to_string()
        } else {
            text.to_string()
        }
    }

    fn success(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_green().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn warning(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_yellow().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn error(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_red().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn header(&self, text: &str) -> String {
        if self.use_colors {
            format!(
                "\n{}\n{}",
                text.lavender().bold(),
                "─".repeat(text.chars().count()).subtext0()
            )
        } else {
            format!("\n{}\n{}", text, "-".repeat(text.chars().count()))
        }
    }

    fn field(&self, name: &str, value: &str) -> String {
        format!("  {}: {}", self.label(name), self.value(value))
    }

    /// Days remaining, colored by urgency.
    fn countdown(&self, days: i64) -> String {
        let text = match days {
            d if d < 0 => format!("expired {} days ago", -d),
            1 => "1 day".to_string(),
            d => format!("{} days", d),
        };
        if days < 7 {
            self.error(&text)
        } else if days <= 21 {
            if self.use_colors {
                text.peach().bold().to_string()
            } else {
                text
            }
        } else if days < 90 {
            self.warning(&text)
        } else {
            self.value(&text)
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_heartbeat(&self, heartbeat: &Heartbeat) -> String {
        let mut output = Vec::new();

        output.push(self.header(&format!("Domain expiry: {}", heartbeat.domain)));

        let status = match heartbeat.status {
            HeartbeatStatus::Up => self.success("✓ Up"),
        };
        output.push(format!("  {}: {}", self.label("Status"), status));
        output.push(self.field("Expires", &format_date(heartbeat.expiry)));
        output.push(format!(
            "  {}: {}",
            self.label("Remaining"),
            self.countdown(heartbeat.days_remaining)
        ));
        output.push(format!("  {}", self.muted(&heartbeat.msg)));

        output.join("\n")
    }

    fn format_extraction(&self, domain: &str, extraction: &Extraction) -> String {
        let mut output = Vec::new();

        output.push(self.header(&format!("WHOIS: {}", domain)));

        match extraction.expiry_date {
            Some(expiry) => {
                let days = (expiry - Utc::now()).num_days();
                output.push(format!(
                    "  {}: {} ({})",
                    self.label("Expires"),
                    self.value(&format_date(expiry)),
                    self.countdown(days)
                ));
            }
            None => output.push(format!(
                "  {}: {}",
                self.label("Expires"),
                self.warning("unknown")
            )),
        }

        if extraction.registry_info.is_empty() {
            output.push(format!("  {}", self.muted("No registry attributes found")));
            return output.join("\n");
        }

        output.push(String::new());
        output.push(format!("  {}", self.label("Registry attributes")));
        let width = extraction
            .registry_info
            .keys()
            .map(|k| k.chars().count())
            .max()
            .unwrap_or(0);
        for (key, value) in &extraction.registry_info {
            output.push(format!(
                "    {:width$}  {}",
                self.muted(key),
                self.value(value),
                width = width
            ));
        }

        output.join("\n")
    }

    fn format_support(&self, support: &DomainSupport) -> String {
        let mut output = Vec::new();
        output.push(self.header(&format!("Supported: {}", support.domain)));
        output.push(self.field("Domain", &support.domain));
        output.push(self.field("TLD", &support.tld));
        output.join("\n")
    }

    fn format_record(&self, record: &ExpiryRecord) -> String {
        let mut output = Vec::new();
        output.push(self.header(&format!("Record: {}", record.domain())));

        let expiry = record.expiry.map(format_date);
        output.push(self.field("Expires", expiry.as_deref().unwrap_or("unknown")));

        let last_check = record
            .last_check
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string());
        output.push(self.field("Last check", last_check.as_deref().unwrap_or("never")));

        let notified = record
            .last_notification_threshold
            .map(|t| format!("{} days", t));
        output.push(self.field("Last notified", notified.as_deref().unwrap_or("none")));

        output.join("\n")
    }

    fn format_error(&self, error: &ExpiryError) -> String {
        let prefix = if error.is_support_error() {
            self.warning("Not supported:")
        } else {
            self.error("Error:")
        };
        format!("{} {}", prefix, error)
    }
}
