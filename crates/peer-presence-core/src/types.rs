//! Type definitions shared by the presence engine.
//!
//! Everything here is plain data. Events serialize with the same names the
//! CLI prints in NDJSON mode (`ping-result`, `present`, `not-present`).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of echo requests per probe.
pub const DEFAULT_PING_COUNT: u32 = 1;

/// Default probe timeout in seconds.
pub const DEFAULT_PING_TIMEOUT_SECS: f64 = 5.0;

/// Normalized identifier of a peer device.
///
/// Identifiers are lower-cased on construction so that `AA:BB` and `aa:bb`
/// name the same device.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DeviceId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for DeviceId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Parameters for a single probe invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingOptions {
    /// Number of echo requests sent by the probe tool
    pub count: u32,
    /// Seconds the probe tool waits for a response
    pub timeout_secs: f64,
}

impl Default for PingOptions {
    fn default() -> Self {
        Self {
            count: DEFAULT_PING_COUNT,
            timeout_secs: DEFAULT_PING_TIMEOUT_SECS,
        }
    }
}

impl PingOptions {
    /// Build options from a partial update.
    ///
    /// Absent, zero and NaN fields fall back to the defaults, never to
    /// previously stored values. Negative timeouts pass through unchanged.
    pub fn from_update(update: PingOptionsUpdate) -> Self {
        let count = match update.count {
            Some(count) if count != 0 => count,
            _ => DEFAULT_PING_COUNT,
        };
        let timeout_secs = match update.timeout_secs {
            Some(secs) if secs != 0.0 && !secs.is_nan() => secs,
            _ => DEFAULT_PING_TIMEOUT_SECS,
        };

        Self {
            count,
            timeout_secs,
        }
    }
}

/// Partial probe options as supplied by callers and config files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingOptionsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,
}

/// Classified outcome of one probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingResult {
    /// Probed device
    pub address: DeviceId,
    /// Whether the device answered
    pub is_present: bool,
    /// When the outcome was classified
    pub checked_at: DateTime<Utc>,
}

impl PingResult {
    pub fn new(address: DeviceId, is_present: bool) -> Self {
        Self {
            address,
            is_present,
            checked_at: Utc::now(),
        }
    }
}

/// Notifications published by the scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum PresenceEvent {
    /// Raw per-probe outcome, published for every result
    PingResult(PingResult),
    /// The collective signal became (or was first reported as) present
    Present { address: DeviceId },
    /// The collective signal became (or was first reported as) not present
    NotPresent { address: DeviceId },
}

impl PresenceEvent {
    /// Event name as used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            PresenceEvent::PingResult(_) => "ping-result",
            PresenceEvent::Present { .. } => "present",
            PresenceEvent::NotPresent { .. } => "not-present",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_lowercases() {
        let id = DeviceId::new("AA:bb:CC:00:11:22");
        assert_eq!(id.as_str(), "aa:bb:cc:00:11:22");
        assert_eq!(id, DeviceId::from("aa:BB:cc:00:11:22"));
    }

    #[test]
    fn test_device_id_deserialize_normalizes() {
        let id: DeviceId = serde_json::from_str(r#""AA:BB""#).unwrap();
        assert_eq!(id.as_str(), "aa:bb");
    }

    #[test]
    fn test_options_default_substitution() {
        let options = PingOptions::from_update(PingOptionsUpdate {
            count: Some(0),
            timeout_secs: None,
        });
        assert_eq!(options.count, 1);
        assert_eq!(options.timeout_secs, 5.0);
    }

    #[test]
    fn test_options_do_not_inherit_previous_values() {
        let custom = PingOptions::from_update(PingOptionsUpdate {
            count: Some(3),
            timeout_secs: Some(2.5),
        });
        assert_eq!(custom.count, 3);
        assert_eq!(custom.timeout_secs, 2.5);

        let replaced = PingOptions::from_update(PingOptionsUpdate {
            count: None,
            timeout_secs: Some(1.0),
        });
        assert_eq!(replaced.count, DEFAULT_PING_COUNT);
        assert_eq!(replaced.timeout_secs, 1.0);
    }

    #[test]
    fn test_options_accept_negative_timeout() {
        let options = PingOptions::from_update(PingOptionsUpdate {
            count: Some(2),
            timeout_secs: Some(-1.0),
        });
        assert_eq!(options.timeout_secs, -1.0);
    }

    #[test]
    fn test_options_nan_timeout_falls_back() {
        let options = PingOptions::from_update(PingOptionsUpdate {
            count: None,
            timeout_secs: Some(f64::NAN),
        });
        assert_eq!(options.timeout_secs, DEFAULT_PING_TIMEOUT_SECS);
    }

    #[test]
    fn test_event_serialization_names() {
        let event = PresenceEvent::NotPresent {
            address: DeviceId::new("AA:BB"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "not-present");
        assert_eq!(json["address"], "aa:bb");
        assert_eq!(event.name(), "not-present");

        let event = PresenceEvent::PingResult(PingResult::new(DeviceId::new("x"), true));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "ping-result");
        assert_eq!(json["isPresent"], true);
    }
}
