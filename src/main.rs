//! Outbound health checker.
//!
//! Probes every configured outbound through the destination URL, keeps a
//! windowed latency history per outbound and serves it over the admin API.
//!
//! ```text
//! outbound-health --config health.toml          # run until Ctrl-C / SIGTERM
//! outbound-health --config health.toml --once   # one round, print JSON stats
//! ```

use clap::Parser;
use std::path::PathBuf;

use outbound_health::config::{load_config, AppConfig};
use outbound_health::lifecycle::startup;
use outbound_health::observability::logging;

#[derive(Parser)]
#[command(name = "outbound-health")]
#[command(about = "Latency health checker for proxy outbounds", long_about = None)]
struct Cli {
    /// Path to the TOML configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single check round, print the statistics as JSON and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init_logging(&config.observability.log_level)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        outbounds = config.outbounds.len(),
        interval_secs = config.health_check.interval_secs,
        "outbound-health starting"
    );

    if cli.once {
        let report = startup::run_once(&config).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    startup::run(config).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
