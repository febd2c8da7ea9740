use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use super::parser::extract;
use super::servers::{get_tld, get_whois_server, IANA_WHOIS_SERVER};
use crate::error::{ExpiryError, Result};

const WHOIS_PORT: u16 = 43;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RESPONSE_SIZE: usize = 1024 * 1024;
const READ_CHUNK: usize = 4096;
const MAX_REFERRAL_DEPTH: u8 = 3;

static REFERRAL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?im)^\s*Registrar WHOIS Server:[ \t]*(\S+)",
        r"(?im)^\s*Whois Server:[ \t]*(\S+)",
        r"(?im)^\s*ReferralServer:[ \t]*r?whois://(\S+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid WHOIS referral regex"))
    .collect()
});

static IANA_REFER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(?:refer|whois):[ \t]*(\S+)").expect("Invalid IANA refer regex")
});

/// Source of raw registry text for a domain.
///
/// Implementations never surface transport faults: anything that prevents
/// a usable answer is reported as `None`.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn query(&self, domain: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct WhoisClient {
    timeout: Duration,
    port: u16,
    server: Option<String>,
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WhoisClient {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            port: WHOIS_PORT,
            server: None,
        }
    }

    /// Per-operation socket timeout (connect, write and each read).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Query this server instead of the one chosen from the TLD.
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Fetch the raw WHOIS text for `domain`, following registrar referrals.
    #[instrument(skip(self), fields(domain = %domain))]
    pub async fn lookup(&self, domain: &str) -> Result<String> {
        let domain = domain.trim().trim_end_matches('.').to_lowercase();

        let server = match &self.server {
            Some(server) => server.clone(),
            None => {
                let tld =
                    get_tld(&domain).ok_or_else(|| ExpiryError::InvalidDomain(domain.clone()))?;
                match get_whois_server(tld) {
                    Some(server) => server.to_string(),
                    None => self.discover_server(tld).await?,
                }
            }
        };

        let mut visited = HashSet::new();
        self.lookup_with_referrals(&domain, &server, 0, &mut visited)
            .await
    }

    /// Ask IANA which server is authoritative for a TLD missing from the table.
    async fn discover_server(&self, tld: &str) -> Result<String> {
        debug!(tld = %tld, "Discovering WHOIS server via IANA");
        let response = self.query_server(IANA_WHOIS_SERVER, tld).await?;
        extract_iana_server(&response).ok_or_else(|| ExpiryError::WhoisServerNotFound(tld.to_string()))
    }

    fn lookup_with_referrals<'a>(
        &'a self,
        domain: &'a str,
        whois_server: &'a str,
        depth: u8,
        visited: &'a mut HashSet<String>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            visited.insert(whois_server.to_lowercase());

            debug!(whois_server = %whois_server, depth = depth, "Querying WHOIS server");
            let raw_response = self.query_server(whois_server, domain).await?;

            let Some(referral) = extract_referral(&raw_response) else {
                return Ok(raw_response);
            };

            if visited.contains(&referral) {
                debug!(referral = %referral, "Ignoring circular WHOIS referral");
                return Ok(raw_response);
            }
            if depth + 1 >= MAX_REFERRAL_DEPTH {
                warn!(depth = depth, server = %whois_server, "Max referral depth reached");
                return Ok(raw_response);
            }

            debug!(referral = %referral, "Following referral");
            match self
                .lookup_with_referrals(domain, &referral, depth + 1, visited)
                .await
            {
                Ok(referred) if extract(&referred).expiry_date.is_some() => Ok(referred),
                Ok(_) => {
                    debug!(referral = %referral, "Referral answer has no expiry date, keeping registry response");
                    Ok(raw_response)
                }
                Err(e) => {
                    // The registry answer usually carries the expiry too
                    debug!(referral = %referral, error = %e, "Referral failed, keeping registry response");
                    Ok(raw_response)
                }
            }
        })
    }

    async fn query_server(&self, server: &str, query: &str) -> Result<String> {
        let mut stream = self.connect(server).await?;

        let request = format!("{}\r\n", query);
        match timeout(self.timeout, stream.write_all(request.as_bytes())).await {
            Ok(written) => written
                .map_err(|e| ExpiryError::WhoisError(format!("{}: send failed: {}", server, e)))?,
            Err(_) => return Err(ExpiryError::Timeout(format!("{}: send", server))),
        }

        let bytes = self.read_response(&mut stream, server).await?;
        Ok(decode_response(bytes))
    }

    async fn connect(&self, server: &str) -> Result<TcpStream> {
        match timeout(self.timeout, TcpStream::connect((server, self.port))).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(ExpiryError::WhoisError(format!(
                "{}: connect failed: {}",
                server, e
            ))),
            Err(_) => Err(ExpiryError::Timeout(format!("{}: connect", server))),
        }
    }

    /// Read until the server closes or goes quiet; more than the size cap fails.
    async fn read_response(&self, stream: &mut TcpStream, server: &str) -> Result<Vec<u8>> {
        let mut response = Vec::with_capacity(READ_CHUNK);
        let mut chunk = [0u8; READ_CHUNK];

        while response.len() <= MAX_RESPONSE_SIZE {
            let read = match timeout(self.timeout, stream.read(&mut chunk)).await {
                Ok(read) => read
                    .map_err(|e| ExpiryError::WhoisError(format!("{}: read failed: {}", server, e)))?,
                Err(_) if response.is_empty() => {
                    return Err(ExpiryError::Timeout(format!("{}: no response", server)));
                }
                // Some servers never close the connection
                Err(_) => break,
            };
            if read == 0 {
                break;
            }
            response.extend_from_slice(&chunk[..read]);
        }

        if response.len() > MAX_RESPONSE_SIZE {
            return Err(ExpiryError::WhoisError(format!(
                "{}: response exceeds {} bytes",
                server, MAX_RESPONSE_SIZE
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl RegistryClient for WhoisClient {
    async fn query(&self, domain: &str) -> Option<String> {
        match self.lookup(domain).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                debug!(domain = %domain, "WHOIS server returned an empty response");
                None
            }
            Err(e) => {
                warn!(domain = %domain, error = %e, "WHOIS query failed");
                None
            }
        }
    }
}

/// UTF-8 when valid, otherwise every byte read as its Latin-1 code point.
fn decode_response(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().into_iter().map(char::from).collect(),
    }
}

fn clean_server_name(raw: &str) -> Option<String> {
    let server = raw
        .trim()
        .trim_start_matches("whois://")
        .trim_start_matches("rwhois://")
        .trim_end_matches('/')
        .to_lowercase();
    // Drop an explicit port, the client always uses its own
    let server = server.split(':').next().unwrap_or_default().to_string();
    (!server.is_empty() && server.contains('.')).then_some(server)
}

fn extract_referral(response: &str) -> Option<String> {
    REFERRAL_PATTERNS.iter().find_map(|re| {
        re.captures(response)
            .and_then(|caps| caps.get(1))
            .and_then(|m| clean_server_name(m.as_str()))
    })
}

fn extract_iana_server(response: &str) -> Option<String> {
    IANA_REFER
        .captures(response)
        .and_then(|caps| caps.get(1))
        .and_then(|m| clean_server_name(m.as_str()))
}
