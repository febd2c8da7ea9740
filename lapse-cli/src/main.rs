mod display;

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use lapse_core::colors::CatppuccinExt;
use lapse_core::expiry::NOTIFY_DAYS_SETTING;
use lapse_core::output::{get_formatter, OutputFormat, OutputFormatter};
use lapse_core::{
    DomainExpiry, DomainExpiryCheck, ExpiryError, ExpiryStore, LogProvider, MemorySettings,
    MemoryStore, Monitor, MonitorCheck, MonitorType, Notification, SettingsStore, SqliteStore,
    WebhookProvider, WhoisClient,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use display::Spinner;

#[derive(Parser)]
#[command(name = "lapse")]
#[command(about = "Domain registration expiry checks and notifications")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (human or json)
    #[arg(short, long, global = true, default_value = "human")]
    format: String,

    /// SQLite database URL (e.g. sqlite://lapse.db); in-memory when omitted
    #[arg(long, global = true)]
    db: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one expiry check for a monitor target and send due notifications
    Check {
        /// URL or hostname being monitored
        target: String,
        /// Monitor type, decides whether the target is a URL or a hostname
        #[arg(short = 't', long = "type", default_value = "http")]
        monitor_type: String,
        /// Webhook to notify; repeatable. Notifications are logged when omitted
        #[arg(short, long)]
        webhook: Vec<String>,
        /// Notification thresholds in days, comma separated (e.g. 7,14,21)
        #[arg(long, value_delimiter = ',')]
        thresholds: Option<Vec<u32>>,
        /// Give up on the whole check after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Query the registry and show the extracted expiry and attributes
    Whois {
        /// Domain name to look up
        domain: String,
        /// Query this WHOIS server instead of the TLD's registry
        #[arg(short, long)]
        server: Option<String>,
        /// Print the raw response text
        #[arg(long)]
        raw: bool,
    },
    /// Show the domain a monitor target would be checked under
    Support {
        /// URL or hostname being monitored
        target: String,
        /// Monitor type
        #[arg(short = 't', long = "type", default_value = "http")]
        monitor_type: String,
    },
    /// Show the stored expiry record for a domain
    Record {
        /// Registrable domain, e.g. example.com
        domain: String,
    },
    /// Manage the database schema
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Apply pending migrations
    Migrate,
    /// Revert migrations newer than a version
    Rollback {
        /// Schema version to return to
        version: i64,
    },
}

struct Stores {
    records: Arc<dyn ExpiryStore>,
    settings: Arc<dyn SettingsStore>,
}

async fn open_stores(db: Option<&str>) -> anyhow::Result<Stores> {
    match db {
        Some(url) => {
            let store = Arc::new(SqliteStore::connect(url).await?);
            let version = store.migrate().await?;
            debug!(url = %url, version, "Opened database");
            Ok(Stores {
                records: store.clone(),
                settings: store,
            })
        }
        None => Ok(Stores {
            records: Arc::new(MemoryStore::new()),
            settings: Arc::new(MemorySettings::new()),
        }),
    }
}

fn build_monitor(target: String, monitor_type: &str) -> Monitor {
    let monitor_type = MonitorType::from(monitor_type);
    let is_hostname = matches!(
        monitor_type.target_field(),
        Some(lapse_core::monitor::TargetField::Hostname)
    );
    let monitor = Monitor::new(0, target.clone(), monitor_type);
    if is_hostname {
        monitor.with_hostname(target)
    } else {
        monitor.with_url(target)
    }
}

fn fail(formatter: &dyn OutputFormatter, error: &ExpiryError) -> ! {
    eprintln!("{}", formatter.format_error(error));
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let output_format: OutputFormat = cli.format.parse().unwrap_or_default();

    execute_command(cli.command, cli.db.as_deref(), output_format).await
}

async fn execute_command(
    command: Commands,
    db: Option<&str>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let formatter = get_formatter(output_format);

    match command {
        Commands::Check {
            target,
            monitor_type,
            webhook,
            thresholds,
            timeout,
        } => {
            let stores = open_stores(db).await?;
            if let Some(thresholds) = thresholds {
                stores
                    .settings
                    .set_setting(NOTIFY_DAYS_SETTING, serde_json::json!(thresholds), "general")
                    .await?;
            }

            let notifications: Vec<Notification> = if webhook.is_empty() {
                vec![Notification::new("log", Arc::new(LogProvider))]
            } else {
                webhook
                    .into_iter()
                    .map(|url| Notification::new(url.clone(), Arc::new(WebhookProvider::new(url))))
                    .collect()
            };

            let service = DomainExpiry::new(
                stores.records,
                stores.settings,
                Arc::new(WhoisClient::new()),
            );
            let mut check = DomainExpiryCheck::new(Arc::new(service), notifications);
            if let Some(secs) = timeout {
                check = check.with_timeout(Duration::from_secs(secs));
            }

            let monitor = build_monitor(target, &monitor_type);
            let spinner = match output_format {
                OutputFormat::Human => Spinner::new(&format!("Checking {}...", monitor.name)),
                OutputFormat::Json => Spinner::hidden(),
            };
            let result = check.check(&monitor).await;
            spinner.finish();

            match result {
                Ok(heartbeat) => println!("{}", formatter.format_heartbeat(&heartbeat)),
                Err(e) => fail(formatter.as_ref(), &e),
            }
        }
        Commands::Whois {
            domain,
            server,
            raw,
        } => {
            let domain = lapse_core::normalize(&domain);
            let mut client = WhoisClient::new();
            if let Some(server) = server {
                client = client.with_server(server);
            }

            let spinner = match output_format {
                OutputFormat::Human => Spinner::new(&format!("Querying WHOIS for {}...", domain)),
                OutputFormat::Json => Spinner::hidden(),
            };
            let result = client.lookup(&domain).await;
            spinner.finish();

            match result {
                Ok(text) if raw => println!("{}", text),
                Ok(text) => {
                    let extraction = lapse_core::whois::extract(&text);
                    println!("{}", formatter.format_extraction(&domain, &extraction));
                }
                Err(e) => fail(formatter.as_ref(), &e),
            }
        }
        Commands::Support {
            target,
            monitor_type,
        } => {
            let monitor = build_monitor(target, &monitor_type);
            match lapse_core::check_support(&monitor) {
                Ok(support) => println!("{}", formatter.format_support(&support)),
                Err(e) => fail(formatter.as_ref(), &e),
            }
        }
        Commands::Record { domain } => {
            let stores = open_stores(db).await?;
            match stores.records.find(&lapse_core::normalize(&domain)).await? {
                Some(record) => println!("{}", formatter.format_record(&record)),
                None => {
                    eprintln!("{} No record for {}", "Error:".ctp_red(), domain);
                    std::process::exit(1);
                }
            }
        }
        Commands::Db { action } => {
            let Some(url) = db else {
                eprintln!("{} --db is required for schema commands", "Error:".ctp_red());
                std::process::exit(1);
            };
            let store = SqliteStore::connect(url).await?;
            let version = match action {
                DbAction::Migrate => store.migrate().await?,
                DbAction::Rollback { version } => store.rollback_to(version).await?,
            };
            println!("Schema version: {}", version);
        }
    }

    Ok(())
}
