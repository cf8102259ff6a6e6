//! One-time preflight check that the probe tool is installed.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::process::Command;
use tracing::{debug, info};

use super::ProbeCommand;
use crate::error::ProbeError;

/// Confirms the probe program exists before the first scan.
///
/// A successful check is remembered; later calls return immediately.
#[derive(Debug)]
pub struct AvailabilityGate {
    command: ProbeCommand,
    confirmed: AtomicBool,
}

impl AvailabilityGate {
    pub fn new(command: ProbeCommand) -> Self {
        Self {
            command,
            confirmed: AtomicBool::new(false),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed.load(Ordering::SeqCst)
    }

    /// Run `<lookup> <program>` unless availability was already confirmed.
    pub async fn ensure(&self) -> Result<(), ProbeError> {
        if self.is_confirmed() {
            return Ok(());
        }

        let program = &self.command.program;
        debug!("Looking up probe tool with: {} {}", self.command.lookup, program);

        let status = Command::new(&self.command.lookup)
            .arg(program)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| ProbeError::Lookup {
                program: program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ProbeError::Unavailable {
                program: program.clone(),
            });
        }

        self.confirmed.store(true, Ordering::SeqCst);
        info!("Probe tool '{}' is available", program);
        Ok(())
    }
}
