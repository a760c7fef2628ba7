//! Command-line interface parsing for the revenue server
//!
//! This module handles parsing of CLI arguments using clap and resolves them,
//! together with environment fallbacks, into the configuration used at startup.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::cache::RevenueCache;
use crate::data::SENSOR_TOWER_API_URL;

/// Error types for startup configuration
#[derive(Debug, Error)]
pub enum CliError {
    /// No --cache-dir given and no home directory to derive one from
    #[error("Could not determine a cache directory; pass --cache-dir")]
    NoCacheDir,

    /// The provider URL does not parse
    #[error("Invalid API URL '{0}': {1}")]
    InvalidApiUrl(String, String),
}

/// App Store revenue server - Sensor Tower lookups over MCP stdio
#[derive(Parser, Debug)]
#[command(name = "appstore-revenue")]
#[command(about = "MCP server for App Store revenue estimates with a 30-day cache")]
#[command(version)]
pub struct Cli {
    /// Directory holding revenue-cache.json (defaults to the XDG cache dir)
    #[arg(long, value_name = "DIR", env = "APPSTORE_REVENUE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Sensor Tower apps endpoint
    #[arg(long, value_name = "URL", env = "SENSOR_TOWER_API_URL", default_value = SENSOR_TOWER_API_URL)]
    pub api_url: String,

    /// Request timeout for provider calls, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Empty the cache before serving
    #[arg(long)]
    pub clear_cache: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub cache_dir: PathBuf,
    pub api_url: String,
    pub timeout: Duration,
    pub clear_cache: bool,
    pub verbose: bool,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with the cache directory resolved
    /// * `Err(CliError)` if no cache directory is available or the URL is invalid
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        Self::resolve(cli, RevenueCache::default_dir())
    }

    /// Like `from_cli`, with the fallback cache directory supplied by the caller
    fn resolve(cli: &Cli, default_dir: Option<PathBuf>) -> Result<Self, CliError> {
        let cache_dir = cli
            .cache_dir
            .clone()
            .or(default_dir)
            .ok_or(CliError::NoCacheDir)?;

        reqwest::Url::parse(&cli.api_url)
            .map_err(|e| CliError::InvalidApiUrl(cli.api_url.clone(), e.to_string()))?;

        Ok(StartupConfig {
            cache_dir,
            api_url: cli.api_url.clone(),
            timeout: Duration::from_secs(cli.timeout),
            clear_cache: cli.clear_cache,
            verbose: cli.verbose,
        })
    }
}
