//! Probe command implementation.

use peer_presence_core::ScannerConfig;

use super::apply_overrides;
use crate::cli::ProbeArgs;
use crate::error::{CliError, Result};
use crate::output::get_formatter;

/// Run the probe command
pub async fn run_probe(args: ProbeArgs, mut config: ScannerConfig, json: bool) -> Result<()> {
    let formatter = get_formatter(json);
    apply_overrides(&mut config, args.devices, &args.ping)?;

    let scanner = config.build_scanner().await;
    let results = scanner.probe_once().await?;

    println!("{}", formatter.format_results(&results));

    if results.iter().any(|r| r.is_present) {
        Ok(())
    } else {
        Err(CliError::NotPresent)
    }
}
