use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Root zone WHOIS, used to discover the server for TLDs missing below.
pub const IANA_WHOIS_SERVER: &str = "whois.iana.org";

const KNOWN_SERVERS: &[(&str, &str)] = &[
    // Generic TLDs
    ("com", "whois.verisign-grs.com"),
    ("net", "whois.verisign-grs.com"),
    ("org", "whois.pir.org"),
    ("info", "whois.afilias.net"),
    ("biz", "whois.nic.biz"),
    ("name", "whois.nic.name"),
    ("mobi", "whois.afilias.net"),
    ("pro", "whois.registrypro.pro"),
    ("edu", "whois.educause.edu"),
    ("gov", "whois.dotgov.gov"),
    ("int", "whois.iana.org"),
    // Newer gTLDs
    ("app", "whois.nic.google"),
    ("dev", "whois.nic.google"),
    ("page", "whois.nic.google"),
    ("blog", "whois.nic.blog"),
    ("cloud", "whois.nic.cloud"),
    ("xyz", "whois.nic.xyz"),
    ("online", "whois.nic.online"),
    ("site", "whois.nic.site"),
    ("tech", "whois.nic.tech"),
    ("store", "whois.nic.store"),
    ("shop", "whois.nic.shop"),
    ("live", "whois.nic.live"),
    ("world", "whois.nic.world"),
    ("email", "whois.nic.email"),
    ("link", "whois.uniregistry.net"),
    ("top", "whois.nic.top"),
    // ccTLDs
    ("io", "whois.nic.io"),
    ("co", "whois.nic.co"),
    ("me", "whois.nic.me"),
    ("tv", "whois.nic.tv"),
    ("cc", "ccwhois.verisign-grs.com"),
    ("ai", "whois.nic.ai"),
    ("gg", "whois.gg"),
    ("uk", "whois.nic.uk"),
    ("de", "whois.denic.de"),
    ("fr", "whois.nic.fr"),
    ("nl", "whois.domain-registry.nl"),
    ("be", "whois.dns.be"),
    ("eu", "whois.eu"),
    ("it", "whois.nic.it"),
    ("es", "whois.nic.es"),
    ("ch", "whois.nic.ch"),
    ("li", "whois.nic.li"),
    ("at", "whois.nic.at"),
    ("se", "whois.iis.se"),
    ("nu", "whois.iis.nu"),
    ("dk", "whois.dk-hostmaster.dk"),
    ("no", "whois.norid.no"),
    ("fi", "whois.fi"),
    ("pl", "whois.dns.pl"),
    ("cz", "whois.nic.cz"),
    ("ru", "whois.tcinet.ru"),
    ("us", "whois.nic.us"),
    ("ca", "whois.cira.ca"),
    ("au", "whois.auda.org.au"),
    ("nz", "whois.irs.net.nz"),
    ("jp", "whois.jprs.jp"),
    ("kr", "whois.kr"),
    ("cn", "whois.cnnic.cn"),
    ("in", "whois.registry.in"),
    ("br", "whois.registro.br"),
    ("mx", "whois.mx"),
];

static WHOIS_SERVERS: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| KNOWN_SERVERS.iter().copied().collect());

pub fn get_whois_server(tld: &str) -> Option<&'static str> {
    WHOIS_SERVERS.get(tld.to_lowercase().as_str()).copied()
}

pub fn get_tld(domain: &str) -> Option<&str> {
    domain.rsplit('.').next().filter(|tld| !tld.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_servers() {
        assert_eq!(get_whois_server("com"), Some("whois.verisign-grs.com"));
        assert_eq!(get_whois_server("UK"), Some("whois.nic.uk"));
        assert_eq!(get_whois_server("zz"), None);
    }

    #[test]
    fn test_get_tld() {
        assert_eq!(get_tld("example.co.uk"), Some("uk"));
        assert_eq!(get_tld("example.com"), Some("com"));
        assert_eq!(get_tld("example."), None);
    }
}
