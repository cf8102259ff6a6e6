//! External probe process management.
//!
//! Launches the reachability tool once per device, tracks in-flight
//! processes, and checks that the tool is installed before scanning.

pub mod availability;
pub mod pool;
pub mod runner;

use serde::{Deserialize, Serialize};

pub use availability::AvailabilityGate;
pub use pool::{ProbeHandle, ProbePool};
pub use runner::ProbeRunner;

/// Default reachability tool.
pub const DEFAULT_PROBE_PROGRAM: &str = "l2ping";

/// Default tool used to check that the probe program exists.
pub const DEFAULT_LOOKUP_PROGRAM: &str = "which";

/// How to invoke the external probe tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProbeCommand {
    /// Executable resolved through `PATH`
    pub program: String,
    /// Arguments placed before the per-probe arguments (e.g. a wrapper script)
    pub args: Vec<String>,
    /// Executable that exits 0 when `program` is installed
    pub lookup: String,
}

impl Default for ProbeCommand {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROBE_PROGRAM.to_string(),
            args: Vec::new(),
            lookup: DEFAULT_LOOKUP_PROGRAM.to_string(),
        }
    }
}

impl ProbeCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }
}
