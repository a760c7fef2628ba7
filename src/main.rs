//! App Store revenue server - answer revenue lookups over MCP stdio
//!
//! Stdout carries protocol messages only; all logging goes to stderr.

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use appstore_revenue::cli::{Cli, StartupConfig};
use appstore_revenue::mcp::RevenueServer;
use appstore_revenue::{RevenueCache, RevenueLookup, SensorTowerClient};

/// Sets up stderr logging; `RUST_LOG` overrides the verbosity flag
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    init_logging(config.verbose);
    info!(cache_dir = %config.cache_dir.display(), api_url = %config.api_url, "Starting revenue server");

    let cache = Arc::new(RevenueCache::open(&config.cache_dir));
    if config.clear_cache {
        cache.clear();
        info!("Cleared revenue cache");
    }

    let stats = cache.stats();
    info!(
        total = stats.total_entries,
        valid = stats.valid_entries,
        "Revenue cache ready"
    );

    let client = SensorTowerClient::with_timeout(&config.api_url, config.timeout)?;
    let server = RevenueServer::new(RevenueLookup::new(cache, client));

    server.run_stdio().await?;

    Ok(())
}
