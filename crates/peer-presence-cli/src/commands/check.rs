//! Check command implementation.

use peer_presence_core::probe::AvailabilityGate;
use peer_presence_core::ScannerConfig;

use crate::error::Result;
use crate::output::get_formatter;

/// Run the check command
pub async fn run_check(config: ScannerConfig, json: bool) -> Result<()> {
    let formatter = get_formatter(json);

    AvailabilityGate::new(config.probe.clone()).ensure().await?;

    println!(
        "{}",
        formatter.format_message(&format!("Probe tool '{}' is available", config.probe.program))
    );
    Ok(())
}
