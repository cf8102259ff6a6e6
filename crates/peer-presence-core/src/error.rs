//! Error types for peer-presence core.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for shared operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors from the external probe tool.
///
/// Every variant is fatal: presence detection cannot run without the tool.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Probe tool '{program}' is not installed or not on the search path")]
    Unavailable { program: String },

    #[error("Failed to look up probe tool '{program}': {source}")]
    Lookup {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch probe for {address}: {source}")]
    Launch {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
