//! File-based scanner configuration.
//!
//! A JSON document whose fields are all optional:
//!
//! ```json
//! {
//!   "devices": ["AA:BB:CC:DD:EE:FF"],
//!   "intervalSecs": 15,
//!   "reportFirstResult": true,
//!   "ping": { "count": 1, "timeoutSecs": 5 },
//!   "probe": { "program": "l2ping", "args": [], "lookup": "which" }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::error::ConfigError;
use crate::probe::ProbeCommand;
use crate::scanner::{PresenceScanner, DEFAULT_SCAN_INTERVAL_SECS};
use crate::types::PingOptionsUpdate;

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Get the default config file path.
///
/// Uses the `directories` crate to find the platform-specific config
/// directory.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "peer-presence", "peer-presence")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Scanner settings loaded from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScannerConfig {
    /// Devices to scan
    pub devices: Vec<String>,
    /// Seconds between scan cycles
    pub interval_secs: u64,
    /// Notify on the first result after start even without a change
    pub report_first_result: bool,
    /// Probe options; unset fields use the defaults
    pub ping: PingOptionsUpdate,
    /// External probe tool
    pub probe: ProbeCommand,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            report_first_result: true,
            ping: PingOptionsUpdate::default(),
            probe: ProbeCommand::default(),
        }
    }
}

impl ScannerConfig {
    /// Read a config file.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: ScannerConfig = serde_json::from_str(&content)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given (it must exist), otherwise the default config
    /// file if present, otherwise built-in defaults.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path).await;
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path).await,
            _ => Ok(Self::default()),
        }
    }

    /// Create a scanner with these settings applied.
    pub async fn build_scanner(&self) -> PresenceScanner {
        let scanner = PresenceScanner::new(self.probe.clone());
        scanner.set_devices(&self.devices).await;
        scanner.set_ping_options(self.ping).await;
        scanner.set_interval_seconds(self.interval_secs).await;
        scanner
    }
}
