use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use uptime_monitor::alerting::AlertCoordinator;
use uptime_monitor::config::MonitorConfig;
use uptime_monitor::dashboard::{self, DEFAULT_STATUS_WINDOW_DAYS};
use uptime_monitor::db;
use uptime_monitor::db::models::NewEndpoint;
use uptime_monitor::db::services::{AlertService, CheckService, EndpointService};
use uptime_monitor::notifications::senders::email::EmailSender;
use uptime_monitor::notifications::NotificationService;
use uptime_monitor::probe::HttpChecker;
use uptime_monitor::scheduler::MonitorManager;
use uptime_monitor::version::VERSION;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(author, version = VERSION, about = "HTTP endpoint uptime monitor with email alerting")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Path to the SQLite database file
    #[arg(long, default_value = "uptime.db")]
    database: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monitor all active endpoints until interrupted
    Run,
    /// Register a new endpoint
    Add {
        url: String,
        name: String,
        /// Seconds between checks
        #[arg(long, default_value_t = 300)]
        interval: u32,
        /// Per-check timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u32,
        /// Status code that counts as up
        #[arg(long, default_value_t = 200)]
        expected_status: u16,
    },
    /// List registered endpoints
    List,
    /// Resume monitoring an endpoint
    Enable { id: i64 },
    /// Stop monitoring an endpoint without deleting its history
    Disable { id: i64 },
    /// Change an endpoint's poll interval
    SetInterval { id: i64, seconds: u32 },
    /// Show uptime statistics per endpoint
    Status {
        /// Statistics window in days
        #[arg(long, default_value_t = DEFAULT_STATUS_WINDOW_DAYS)]
        days: i64,
    },
}

fn init_logging() {
    let file_appender = tracing_appender::rolling::daily("logs", "uptime-monitor.log");
    let file_layer = fmt::layer().with_writer(file_appender).with_ansi(false);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    dotenv().ok();
    init_logging();

    let pool = db::connect(&cli.database).await?;
    let endpoints = EndpointService::new(pool.clone());

    match cli.command {
        Command::Run => run(&cli.config, pool, endpoints).await?,
        Command::Add {
            url,
            name,
            interval,
            timeout,
            expected_status,
        } => {
            let endpoint = endpoints
                .register(NewEndpoint {
                    url,
                    name,
                    check_interval_secs: interval,
                    timeout_secs: timeout,
                    expected_status,
                })
                .await?;
            println!(
                "registered endpoint {} ({}) with id {}",
                endpoint.name, endpoint.url, endpoint.id
            );
        }
        Command::List => {
            for endpoint in endpoints.list().await? {
                println!(
                    "{:>4}  {:<8}  every {:>5}s  expect {}  {}  {}",
                    endpoint.id,
                    if endpoint.is_active { "active" } else { "disabled" },
                    endpoint.check_interval_secs,
                    endpoint.expected_status,
                    endpoint.name,
                    endpoint.url,
                );
            }
        }
        Command::Enable { id } => {
            endpoints.set_active(id, true).await?;
            println!("endpoint {id} enabled");
        }
        Command::Disable { id } => {
            endpoints.set_active(id, false).await?;
            println!("endpoint {id} disabled");
        }
        Command::SetInterval { id, seconds } => {
            endpoints.set_interval(id, seconds).await?;
            println!("endpoint {id} now checked every {seconds}s");
        }
        Command::Status { days } => {
            let checks = CheckService::new(pool.clone());
            let overview =
                dashboard::status_overview(&endpoints, &checks, chrono::Duration::days(days))
                    .await?;
            for status in overview {
                match status.stats {
                    Some(stats) => println!(
                        "{}  {}  uptime {:.2}%  avg {:.0} ms  {} checks (last {} days)",
                        status.endpoint.name,
                        status.endpoint.url,
                        stats.success_ratio * 100.0,
                        stats.avg_latency_ms,
                        stats.total_checks,
                        days,
                    ),
                    None => println!(
                        "{}  {}  no checks in the last {} days",
                        status.endpoint.name, status.endpoint.url, days,
                    ),
                }
            }
        }
    }

    Ok(())
}

async fn run(
    config_path: &str,
    pool: sqlx::SqlitePool,
    endpoints: EndpointService,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Missing or malformed configuration is fatal before any monitoring
    // starts.
    let config = match MonitorConfig::load_or_create(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            return Err(e.into());
        }
    };

    let active = endpoints.list_active().await?;
    if active.is_empty() {
        warn!("no active endpoints to monitor, register one with the `add` command");
        return Ok(());
    }

    let checker = Arc::new(HttpChecker::new(&config.general.user_agent)?);
    let sender = Arc::new(EmailSender::new(&config.email, config.general.max_retries)?);
    let notifications = Arc::new(NotificationService::new(
        sender,
        config.email.to_emails.clone(),
    ));
    let alerts = Arc::new(AlertService::new(pool.clone()));
    let checks = Arc::new(CheckService::new(pool.clone()));
    let coordinator = Arc::new(AlertCoordinator::new(alerts, notifications));

    let mut manager = MonitorManager::new(
        checker,
        checks,
        coordinator,
        Duration::from_secs(config.general.retry_delay),
    );

    info!(version = VERSION, count = active.len(), "starting monitoring");
    manager.start_all(active);

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    manager.shutdown(SHUTDOWN_GRACE).await;

    Ok(())
}
