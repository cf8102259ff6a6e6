//! peer-presence CLI - command-line front end for the presence scanner.
//!
//! Watches a set of wireless peers and reports whether any of them is in
//! range, for use from scripts and service managers.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use peer_presence_core::ScannerConfig;

use cli::{Cli, Commands};
use error::{exit_codes, CliError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ScannerConfig::load_or_default(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Watch(args) => commands::run_watch(args, config, cli.json).await,
        Commands::Probe(args) => commands::run_probe(args, config, cli.json).await,
        Commands::Check => commands::run_check(config, cli.json).await,
    }
}
