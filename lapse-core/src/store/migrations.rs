/// One reversible schema step. Versions are tracked in `PRAGMA user_version`.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub up: &'static [&'static str],
    pub down: &'static [&'static str],
}

pub static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create domain_expiry and setting tables",
        up: &[
            r#"
            CREATE TABLE IF NOT EXISTS domain_expiry (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                domain TEXT NOT NULL UNIQUE,
                expiry TEXT,
                last_check TEXT,
                last_expiry_notification_sent INTEGER
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS setting (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL UNIQUE,
                value TEXT,
                type TEXT
            )
            "#,
        ],
        down: &["DROP TABLE IF EXISTS setting", "DROP TABLE IF EXISTS domain_expiry"],
    },
    Migration {
        version: 2,
        description: "keep the parsed WHOIS response per domain",
        up: &["ALTER TABLE domain_expiry ADD COLUMN whois_info TEXT DEFAULT NULL"],
        down: &["ALTER TABLE domain_expiry DROP COLUMN whois_info"],
    },
];

/// Highest schema version known to this build.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}
