//! apt-last-upgrade - HTTP service reporting the last full-system upgrade
//!
//! Reads the apt history log backwards, finds the most recent
//! `apt-get upgrade` / `apt-get dist-upgrade` run and answers
//! `GET /last-upgrade` with its start and end as Unix timestamps.
//!
//! ## Usage
//!
//! ```bash
//! apt-last-upgrade serve --port 8080
//! # or just
//! apt-last-upgrade
//! curl http://127.0.0.1:8080/last-upgrade
//! # {"start_time":1704067200,"end_time":1704067800}
//! ```
//!
//! Configuration is read from a TOML file (`--config`) or from the
//! `APT_LAST_UPGRADE_*` environment variables; command line flags win.

use anyhow::Result;
use apt_last_upgrade::{HistoryServer, ServiceConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "apt-last-upgrade")]
#[command(about = "Serve the time range of the last full-system apt upgrade", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (default)
    Serve(ServeArgs),
    /// Print the last upgrade once and exit
    Check {
        /// History log to scan
        #[arg(long)]
        history_log: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug, Default)]
struct ServeArgs {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Listen port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
    /// History log to scan (overrides config)
    #[arg(long)]
    history_log: Option<PathBuf>,
    /// Pause before every uncached scan in milliseconds (overrides config)
    #[arg(long)]
    scan_delay_ms: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Check { history_log }) => run_check(history_log),
        Some(Commands::Serve(args)) => serve(args),
        None => serve(ServeArgs::default()),
    }
}

fn serve(args: ServeArgs) -> Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run_server(args))
}

async fn run_server(args: ServeArgs) -> Result<()> {
    // Load configuration
    let mut config = if let Some(path) = args.config {
        ServiceConfig::from_file(path)?
    } else {
        ServiceConfig::from_env()
    };

    if let Some(p) = args.port {
        config.listen_port = p;
    }
    if let Some(path) = args.history_log {
        config.history_log = path;
    }
    if let Some(ms) = args.scan_delay_ms {
        config.scan_delay_ms = ms;
    }

    tracing::info!("Starting apt-last-upgrade");

    let server = HistoryServer::bind(&config).await.inspect_err(|e| {
        tracing::error!("Failed to start server: {:?}", e);
    })?;
    server.run().await
}

/// Scan once without caching or delay and print the JSON body
fn run_check(history_log: Option<PathBuf>) -> Result<()> {
    use anyhow::Context;
    use apt_last_upgrade::{scan_file, UpgradeResponse};

    let path = history_log.unwrap_or_else(|| ServiceConfig::from_env().history_log);
    let report =
        scan_file(&path).with_context(|| format!("Failed to scan {}", path.display()))?;

    println!("{}", UpgradeResponse::from(report.result).to_json());
    Ok(())
}
