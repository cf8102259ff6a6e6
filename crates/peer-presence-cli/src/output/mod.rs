//! Output formatting for CLI results.

pub mod json;
pub mod table;

pub use json::JsonOutput;
pub use table::TableOutput;

use peer_presence_core::{PingResult, PresenceEvent};

/// Output formatter trait
pub trait OutputFormatter {
    /// Format one-shot probe results
    fn format_results(&self, results: &[PingResult]) -> String;

    /// Format a single scanner event (one line)
    fn format_event(&self, event: &PresenceEvent) -> String;

    /// Format a generic message
    fn format_message(&self, message: &str) -> String;
}

/// Get the appropriate formatter based on JSON flag
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonOutput::new())
    } else {
        Box::new(TableOutput::new())
    }
}
