use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every attribute seen in a registry response, last occurrence winning.
pub type RegistryInfo = BTreeMap<String, String>;

/// Field names registries use for the registration expiry date.
const EXPIRY_FIELDS: &[&str] = &[
    "Registry Expiry Date",
    "Registrar Registration Expiration Date",
    "Expiration Date",
    "Expiry Date",
    "Expiration Time",
    "Expire Date",
    "Expires On",
    "Expires",
    "Expiry",
    "paid-till",
    "Renewal Date",
    "expire",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y.%m.%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%d %B %Y",
    "%Y.%m.%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%b %d %Y",
    "%Y%m%d",
];

/// Result of scanning a raw registry response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub expiry_date: Option<DateTime<Utc>>,
    pub registry_info: RegistryInfo,
}

/// Extract the expiry date and attribute map from raw registry text.
///
/// Never fails: a response with no recognised expiry field, or one whose value
/// cannot be read as a date, yields `expiry_date: None`.
pub fn extract(raw: &str) -> Extraction {
    let pairs = parse_pairs(raw);

    let expiry_date = pairs
        .iter()
        .find(|(key, _)| is_expiry_field(key))
        .and_then(|(_, value)| parse_date(value));

    let registry_info = pairs.into_iter().collect();

    Extraction {
        expiry_date,
        registry_info,
    }
}

fn is_expiry_field(key: &str) -> bool {
    EXPIRY_FIELDS
        .iter()
        .any(|field| field.eq_ignore_ascii_case(key))
}

fn is_skipped_line(line: &str) -> bool {
    line.is_empty() || line.starts_with('%') || line.starts_with('#') || line.starts_with(">>>")
}

/// Split a response into ordered `key: value` pairs.
///
/// A key with no inline value takes the indented lines below it, as in
/// Nominet-style responses:
///
/// ```text
/// Expiry date:
///     01-January-2025
/// ```
fn parse_pairs(raw: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    // Index of a pair still collecting continuation lines, and its key's indent
    let mut open_block: Option<(usize, usize)> = None;

    for line in raw.lines() {
        let trimmed = line.trim();
        let indent = line.len() - line.trim_start().len();

        if is_skipped_line(trimmed) {
            open_block = None;
            continue;
        }

        if let Some((index, key_indent)) = open_block {
            if indent > key_indent {
                let value = &mut pairs[index].1;
                if !value.is_empty() {
                    value.push_str(", ");
                }
                value.push_str(trimmed);
                continue;
            }
            open_block = None;
        }

        let Some((key, value)) = trimmed.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let value = value.trim();
        pairs.push((key.to_string(), value.to_string()));
        if value.is_empty() {
            open_block = Some((pairs.len() - 1, indent));
        }
    }

    pairs
}

/// Read a registry date value as a UTC instant.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let cleaned = date_str.trim();
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(cleaned) {
        return Some(dt.with_timezone(&Utc));
    }

    // Registries that omit the offset report UTC
    let naive = cleaned
        .trim_end_matches(" (UTC)")
        .trim_end_matches(" UTC")
        .trim_end_matches(" GMT")
        .trim_end_matches('Z')
        .trim();

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(dt.and_utc());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(naive, fmt) {
            return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const VERISIGN: &str = "   Domain Name: EXAMPLE.COM\r
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN\r
   Registrar WHOIS Server: whois.iana.org\r
   Updated Date: 2024-08-14T07:01:34Z\r
   Creation Date: 1995-08-14T04:00:00Z\r
   Registry Expiry Date: 2025-08-13T04:00:00Z\r
   Registrar: RESERVED-Internet Assigned Numbers Authority\r
   Domain Status: clientDeleteProhibited https://icann.org/epp#clientDeleteProhibited\r
   Domain Status: clientTransferProhibited https://icann.org/epp#clientTransferProhibited\r
   Name Server: A.IANA-SERVERS.NET\r
   Name Server: B.IANA-SERVERS.NET\r
   DNSSEC: signedDelegation\r
>>> Last update of whois database: 2024-10-01T12:00:00Z <<<\r
";

    #[test]
    fn test_extract_verisign_response() {
        let extraction = extract(VERISIGN);
        assert_eq!(
            extraction.expiry_date,
            Some(Utc.with_ymd_and_hms(2025, 8, 13, 4, 0, 0).unwrap())
        );
        assert_eq!(
            extraction.registry_info.get("Registrar").map(String::as_str),
            Some("RESERVED-Internet Assigned Numbers Authority")
        );
        // Last occurrence wins
        assert_eq!(
            extraction.registry_info.get("Name Server").map(String::as_str),
            Some("B.IANA-SERVERS.NET")
        );
        assert!(!extraction
            .registry_info
            .keys()
            .any(|k| k.starts_with(">>>")));
    }

    #[test]
    fn test_extract_first_matching_field_wins() {
        let raw = "Registrar Registration Expiration Date: 2031-01-01T00:00:00Z\n\
                   Registry Expiry Date: 2030-01-01T00:00:00Z\n";
        let extraction = extract(raw);
        assert_eq!(
            extraction.expiry_date,
            Some(Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_extract_unrecognized_fields() {
        let raw = "domain: example.test\nstatus: active\nholder: Someone\n";
        let extraction = extract(raw);
        assert!(extraction.expiry_date.is_none());
        assert_eq!(extraction.registry_info.len(), 3);
        assert_eq!(
            extraction.registry_info.get("status").map(String::as_str),
            Some("active")
        );
    }

    #[test]
    fn test_extract_unparseable_date() {
        let extraction = extract("Registry Expiry Date: REDACTED FOR PRIVACY\n");
        assert!(extraction.expiry_date.is_none());
        assert_eq!(extraction.registry_info.len(), 1);
    }

    #[test]
    fn test_extract_garbage_never_panics() {
        for raw in ["", ":::", "\n\n\n", "%% only comments\n# here", "no colon at all", "\u{0}\u{1}:\u{2}"] {
            let extraction = extract(raw);
            assert!(extraction.expiry_date.is_none());
        }
    }

    #[test]
    fn test_extract_nominet_block_format() {
        let raw = "\n    Domain name:\n        example.co.uk\n\n    Expiry date:\n        01-January-2026\n\n    Name servers:\n        ns1.example.co.uk\n        ns2.example.co.uk\n";
        let extraction = extract(raw);
        assert_eq!(
            extraction.expiry_date,
            Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            extraction.registry_info.get("Name servers").map(String::as_str),
            Some("ns1.example.co.uk, ns2.example.co.uk")
        );
    }

    #[test]
    fn test_empty_value_does_not_swallow_sibling_lines() {
        let raw = "   Registrar WHOIS Server: \n   Registrar URL: http://registrar.example\n   Registry Expiry Date: 2029-09-09T00:00:00Z\n";
        let extraction = extract(raw);
        assert!(extraction.expiry_date.is_some());
        assert_eq!(
            extraction.registry_info.get("Registrar WHOIS Server").map(String::as_str),
            Some("")
        );
        assert_eq!(
            extraction.registry_info.get("Registrar URL").map(String::as_str),
            Some("http://registrar.example")
        );
    }

    #[test]
    fn test_extract_case_insensitive_key() {
        let extraction = extract("paid-till: 2027-03-04T21:00:00Z\n");
        assert!(extraction.expiry_date.is_some());
        let extraction = extract("EXPIRE DATE: 2027-03-04\n");
        assert_eq!(
            extraction.expiry_date,
            Some(Utc.with_ymd_and_hms(2027, 3, 4, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_date_formats() {
        let day = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
        assert_eq!(parse_date("2025-01-15T00:00:00Z"), Some(day));
        assert_eq!(parse_date("2025-01-15T00:00:00.000Z"), Some(day));
        assert_eq!(parse_date("2025-01-15T02:00:00+02:00"), Some(day));
        assert_eq!(parse_date("2025-01-15 00:00:00 UTC"), Some(day));
        assert_eq!(parse_date("2025-01-15"), Some(day));
        assert_eq!(parse_date("15-jan-2025"), Some(day));
        assert_eq!(parse_date("15-January-2025"), Some(day));
        assert_eq!(parse_date("2025/01/15"), Some(day));
        assert_eq!(parse_date("15.01.2025"), Some(day));
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }
}
