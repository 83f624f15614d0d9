//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Duplicate - replicate one UDP/TCP stream to many destinations with per-route delay
#[derive(Parser, Debug)]
#[command(
    name = "duplicate",
    author,
    version,
    about = "Delayed fan-out relay for UDP/TCP byte streams",
    long_about = "Receives one inbound stream (UDP unicast/multicast or TCP, optionally TLS)\n\
                  and replicates it to every configured route. Each route applies its own\n\
                  delay and outbound transport (UDP, TCP or TLS). A slow route loses data\n\
                  instead of stalling the others."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "DUPLICATE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "DUPLICATE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay until the inbound stream ends or a route fails
    Relay(RelayArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Replay files as a paced UDP datagram stream (test feeder)
    Split(SplitArgs),
}

/// Arguments for the `relay` command
#[derive(Parser, Debug, Clone)]
pub struct RelayArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "duplicate.toml",
        env = "DUPLICATE_CONFIG"
    )]
    pub config: PathBuf,

    /// Validate configuration and exit without relaying
    #[arg(long)]
    pub dry_run: bool,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "DUPLICATE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "duplicate.toml", env = "DUPLICATE_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "duplicate.toml", env = "DUPLICATE_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show detailed route settings (capacities, TLS)
    #[arg(long)]
    pub routes: bool,

    /// Print the effective configuration: defaults filled in, TLS paths
    /// anchored at the config file's directory
    #[arg(long)]
    pub resolved: bool,
}

/// Arguments for the `split` command
#[derive(Parser, Debug)]
pub struct SplitArgs {
    /// Destination address (host:port)
    pub addr: String,

    /// Files to send, in order, as one continuous stream
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Datagram payload size in bytes
    #[arg(short, long, default_value_t = crate::commands::DEFAULT_SPLIT_SIZE)]
    pub size: usize,

    /// Pause between datagrams (e.g. 1ms, 250us)
    #[arg(short, long, default_value = "1ms", value_parser = humantime::parse_duration)]
    pub interval: Duration,

    /// Bind the sending socket to this local address
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
