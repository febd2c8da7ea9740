mod client;
mod parser;
mod servers;

pub use client::{RegistryClient, WhoisClient};
pub use parser::{extract, parse_date, Extraction, RegistryInfo};
pub use servers::{get_tld, get_whois_server};
