//! JSON-formatted output for CLI.

use serde::Serialize;
use serde_json::json;

use super::OutputFormatter;
use peer_presence_core::{PingResult, PresenceEvent};

pub struct JsonOutput;

impl JsonOutput {
    pub fn new() -> Self {
        Self
    }

    fn to_json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for JsonOutput {
    fn format_results(&self, results: &[PingResult]) -> String {
        let present = results.iter().filter(|r| r.is_present).count();

        Self::to_json(&json!({
            "results": results,
            "summary": {
                "total": results.len(),
                "present": present,
                "absent": results.len() - present,
                "anyPresent": present > 0
            }
        }))
    }

    fn format_event(&self, event: &PresenceEvent) -> String {
        // Compact: one event per line.
        serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::to_string(&json!({ "message": message })).unwrap_or_default()
    }
}
