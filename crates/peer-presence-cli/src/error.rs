//! Error types for the peer-presence CLI.
//!
//! CliError wraps CoreError from the shared library and adds CLI-specific variants.

use peer_presence_core::error::CoreError;
use thiserror::Error;

pub use peer_presence_core::error::{ConfigError, ProbeError};

/// Exit codes for the CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const PROBE_UNAVAILABLE: i32 = 2;
    pub const NOT_PRESENT: i32 = 3;
    pub const INVALID_ARGS: i32 = 4;
}

/// Main error type for the CLI
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No device is present")]
    NotPresent,

    #[error("Scanning halted: {0}")]
    ScanFailed(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Core(e) => match e {
                CoreError::Probe(_) => exit_codes::PROBE_UNAVAILABLE,
                CoreError::Config(_) => exit_codes::INVALID_ARGS,
                CoreError::Io(_) => exit_codes::GENERAL_ERROR,
                CoreError::Other(_) => exit_codes::GENERAL_ERROR,
            },
            CliError::InvalidArgument(_) => exit_codes::INVALID_ARGS,
            CliError::NotPresent => exit_codes::NOT_PRESENT,
            CliError::ScanFailed(_) => exit_codes::PROBE_UNAVAILABLE,
        }
    }
}

// Conversions from core error subtypes to CliError
impl From<ProbeError> for CliError {
    fn from(e: ProbeError) -> Self {
        CliError::Core(CoreError::Probe(e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Core(CoreError::Config(e))
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
