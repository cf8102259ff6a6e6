//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// peer-presence - detect whether any of a set of wireless peers is nearby
#[derive(Parser, Debug)]
#[command(name = "peer-presence")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format (NDJSON for `watch`)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "PEER_PRESENCE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan continuously and print presence events
    Watch(WatchArgs),

    /// Probe devices once and print the results
    Probe(ProbeArgs),

    /// Check that the probe tool is installed
    Check,
}

/// Probe option overrides shared by `watch` and `probe`.
#[derive(Args, Debug, Clone, Default)]
pub struct PingArgs {
    /// Echo requests per probe
    #[arg(short, long)]
    pub count: Option<u32>,

    /// Probe timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<f64>,
}

// ==================== Watch ====================

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Devices to scan (overrides the config file)
    pub devices: Vec<String>,

    /// Seconds between scan cycles
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Only report changes, not the initial state
    #[arg(long)]
    pub quiet_start: bool,

    #[command(flatten)]
    pub ping: PingArgs,
}

// ==================== Probe ====================

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Devices to probe (overrides the config file)
    pub devices: Vec<String>,

    #[command(flatten)]
    pub ping: PingArgs,
}
