//! Command-line interface parsing for the screener server
//!
//! Every option can also be set through an environment variable. The parsed
//! [`Cli`] is validated into a [`ServerConfig`] before anything starts.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use thiserror::Error;

/// Error types for invalid startup configuration
#[derive(Debug, Error)]
pub enum CliError {
    /// The bind address is not an IP address
    #[error("Invalid bind address: '{0}'. Expected an IP address such as 0.0.0.0 or 127.0.0.1")]
    InvalidBindAddress(String),

    /// The upstream timeout must be at least one second
    #[error("Invalid upstream timeout: must be greater than 0 seconds")]
    InvalidTimeout,

    /// The static asset directory does not exist
    #[error("Static directory not found: {0}")]
    StaticDirNotFound(PathBuf),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Screener - cached stock quotes, profiles and charts over HTTP
#[derive(Parser, Debug)]
#[command(name = "screener")]
#[command(about = "Caching HTTP API for stock quotes, profiles, charts and sparklines")]
#[command(version)]
pub struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Address to bind to
    #[arg(long, env = "SCREENER_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Directory of static assets served for non-API paths
    #[arg(long, env = "SCREENER_STATIC_DIR", value_name = "DIR")]
    pub static_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, env = "SCREENER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Timeout for each upstream request, in seconds
    #[arg(long, env = "SCREENER_UPSTREAM_TIMEOUT_SECS", default_value_t = 10)]
    pub upstream_timeout_secs: u64,

    /// Skip prefetching quotes at startup
    #[arg(long)]
    pub no_warmup: bool,
}

/// Validated server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub addr: SocketAddr,
    pub static_dir: Option<PathBuf>,
    pub log_format: LogFormat,
    /// Timeout applied to every upstream request
    pub upstream_timeout: Duration,
    /// Whether to prefetch the quote list after binding
    pub warmup: bool,
}

/// Parses a bind address argument into an IP address.
///
/// # Arguments
/// * `s` - The bind address string from CLI
///
/// # Returns
/// * `Ok(IpAddr)` if the string is a valid IPv4 or IPv6 address
/// * `Err(CliError::InvalidBindAddress)` otherwise
pub fn parse_bind_arg(s: &str) -> Result<IpAddr, CliError> {
    s.trim()
        .parse()
        .map_err(|_| CliError::InvalidBindAddress(s.to_string()))
}

impl ServerConfig {
    /// Creates a ServerConfig from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(ServerConfig)` with validated settings
    /// * `Err(CliError)` if any setting is invalid
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let ip = parse_bind_arg(&cli.bind)?;

        if cli.upstream_timeout_secs == 0 {
            return Err(CliError::InvalidTimeout);
        }

        if let Some(dir) = &cli.static_dir {
            if !dir.is_dir() {
                return Err(CliError::StaticDirNotFound(dir.clone()));
            }
        }

        Ok(ServerConfig {
            addr: SocketAddr::new(ip, cli.port),
            static_dir: cli.static_dir.clone(),
            log_format: cli.log_format,
            upstream_timeout: Duration::from_secs(cli.upstream_timeout_secs),
            warmup: !cli.no_warmup,
        })
    }
}
