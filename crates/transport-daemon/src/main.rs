//! transport-daemon binary entry point.
//!
//! Usage:
//!   transport-daemon run [--stdin-destination <name>]
//!   transport-daemon send --destination <name> <payload> [--flush]
//!   transport-daemon status [--json]

use anyhow::Context;
use clap::{Parser, Subcommand};
use event_store::{EventStore, SqliteEventStore};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use transport_daemon::{enqueue_blocking, init_logging, Daemon, DaemonConfig, Paths};
use transport_types::{DeliveryKey, Priority};

/// Buffers telemetry events on disk and delivers them to configured backends.
#[derive(Parser)]
#[command(name = "transport-daemon")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, database and logs. Defaults to ~/.transport-daemon
    #[arg(long, env = "TRANSPORT_DAEMON_HOME", global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run in the foreground, delivering stored and incoming events until interrupted
    Run {
        /// Enqueue each line read from stdin as an event for this destination
        #[arg(long)]
        stdin_destination: Option<String>,

        /// Priority for events read from stdin
        #[arg(long, default_value = "default")]
        priority: Priority,

        /// Transport name recorded for events read from stdin
        #[arg(long, default_value = "stdin")]
        transport: String,
    },
    /// Enqueue a single event
    Send {
        #[arg(long)]
        destination: String,

        payload: String,

        #[arg(long, default_value = "default")]
        priority: Priority,

        #[arg(long, default_value = "cli")]
        transport: String,

        /// Deliver before exiting instead of leaving the event for the next run
        #[arg(long)]
        flush: bool,

        /// How long --flush waits for delivery
        #[arg(long, default_value = "10")]
        wait_secs: u64,
    },
    /// Show stored events per (destination, priority)
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let mut config = DaemonConfig::load(&paths)
        .with_context(|| format!("loading {}", paths.config_file().display()))?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    match cli.command {
        Commands::Run {
            stdin_destination,
            priority,
            transport,
        } => {
            paths.ensure_dirs()?;
            init_logging(&config.log_level, Some(paths.log_file()))?;
            run(config, paths, stdin_destination, priority, transport).await?;
        }
        Commands::Send {
            destination,
            payload,
            priority,
            transport,
            flush,
            wait_secs,
        } => {
            init_logging(&config.log_level, None)?;
            send(
                config,
                paths,
                &destination,
                payload,
                priority,
                &transport,
                flush.then(|| Duration::from_secs(wait_secs)),
            )
            .await?;
        }
        Commands::Status { json } => {
            init_logging(&config.log_level, None)?;
            status(&config, &paths, json)?;
        }
    }

    Ok(())
}

async fn run(
    config: DaemonConfig,
    paths: Paths,
    stdin_destination: Option<String>,
    priority: Priority,
    transport: String,
) -> anyhow::Result<()> {
    let daemon = Daemon::start(&config, &paths).await?;

    if let Some(destination) = stdin_destination {
        let runtime = daemon.runtime().clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => {
                        let runtime = runtime.clone();
                        let payload = line.into_bytes();
                        if let Err(e) =
                            enqueue_blocking(runtime, &destination, &transport, priority, payload).await
                        {
                            warn!(destination = %destination, error = %e, "Dropping stdin event");
                        }
                    }
                    Ok(None) => {
                        info!("stdin closed");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to read stdin");
                        break;
                    }
                }
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, exiting...");
    daemon.shutdown().await;
    Ok(())
}

async fn send(
    config: DaemonConfig,
    paths: Paths,
    destination: &str,
    payload: String,
    priority: Priority,
    transport: &str,
    flush: Option<Duration>,
) -> anyhow::Result<()> {
    let daemon = Daemon::start(&config, &paths).await?;
    let id = daemon
        .enqueue(destination, transport, priority, payload.into_bytes())
        .await?;
    println!("enqueued event {} for {}/{}", id, destination, priority);

    if let Some(timeout) = flush {
        let key = DeliveryKey::new(destination, priority);
        if daemon.wait_until_drained(&key, timeout).await? {
            println!("delivered");
        } else {
            println!("still pending after {}s; it will be retried on the next run", timeout.as_secs());
        }
    }

    daemon.shutdown().await;
    Ok(())
}

fn status(config: &DaemonConfig, paths: &Paths, json: bool) -> anyhow::Result<()> {
    let database = config.database_path(paths);
    if !database.exists() {
        println!("no event database at {}", database.display());
        return Ok(());
    }

    let store = SqliteEventStore::open(&database, config.scheduler.store_config())?;
    let counts = store.pending_counts()?;

    if json {
        let rows: Vec<serde_json::Value> = counts
            .iter()
            .map(|(key, count)| {
                serde_json::json!({
                    "destination": key.destination,
                    "priority": key.priority,
                    "pending": count,
                    "configured": config.backend(&key.destination).is_some(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if counts.is_empty() {
        println!("no pending events");
        return Ok(());
    }
    println!("{:<24} {:<10} {:>8}  {}", "DESTINATION", "PRIORITY", "PENDING", "BACKEND");
    for (key, count) in counts {
        let backend = if config.backend(&key.destination).is_some() {
            "configured"
        } else {
            "missing"
        };
        println!(
            "{:<24} {:<10} {:>8}  {}",
            key.destination,
            key.priority.as_str(),
            count,
            backend
        );
    }
    Ok(())
}
