//! Command implementations.

pub mod check;
pub mod probe;
pub mod watch;

pub use check::run_check;
pub use probe::run_probe;
pub use watch::run_watch;

use peer_presence_core::ScannerConfig;

use crate::cli::PingArgs;
use crate::error::{CliError, Result};

/// Apply command-line overrides on top of the loaded config.
///
/// Devices given on the command line replace the configured list. Ping
/// overrides replace individual fields.
pub fn apply_overrides(
    config: &mut ScannerConfig,
    devices: Vec<String>,
    ping: &PingArgs,
) -> Result<()> {
    if !devices.is_empty() {
        config.devices = devices;
    }

    if config.devices.is_empty() {
        return Err(CliError::InvalidArgument(
            "no devices given on the command line or in the config file".to_string(),
        ));
    }

    if ping.count.is_some() {
        config.ping.count = ping.count;
    }
    if ping.timeout.is_some() {
        config.ping.timeout_secs = ping.timeout;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_devices_replace_config_devices() {
        let mut config = ScannerConfig {
            devices: vec!["aa".to_string()],
            ..ScannerConfig::default()
        };

        apply_overrides(&mut config, vec!["bb".to_string()], &PingArgs::default()).unwrap();

        assert_eq!(config.devices, vec!["bb"]);
    }

    #[test]
    fn test_ping_overrides_are_per_field() {
        let mut config = ScannerConfig {
            devices: vec!["aa".to_string()],
            ..ScannerConfig::default()
        };
        config.ping.count = Some(3);

        let ping = PingArgs {
            count: None,
            timeout: Some(1.5),
        };
        apply_overrides(&mut config, Vec::new(), &ping).unwrap();

        assert_eq!(config.ping.count, Some(3));
        assert_eq!(config.ping.timeout_secs, Some(1.5));
    }

    #[test]
    fn test_no_devices_is_invalid() {
        let mut config = ScannerConfig::default();

        let err = apply_overrides(&mut config, Vec::new(), &PingArgs::default()).unwrap_err();

        assert!(matches!(err, CliError::InvalidArgument(_)));
    }
}
