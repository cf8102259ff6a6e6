//! Table-formatted output for CLI.

use colored::*;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use super::OutputFormatter;
use peer_presence_core::{PingResult, PresenceEvent};

/// Timestamp format for event lines.
const TIME_FORMAT: &str = "%H:%M:%S";

pub struct TableOutput;

impl TableOutput {
    pub fn new() -> Self {
        Self
    }

    fn status_cell(is_present: bool) -> Cell {
        if is_present {
            Cell::new("present").fg(Color::Green)
        } else {
            Cell::new("absent").fg(Color::Red)
        }
    }
}

impl Default for TableOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TableOutput {
    fn format_results(&self, results: &[PingResult]) -> String {
        if results.is_empty() {
            return "No devices probed.".to_string();
        }

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Device", "Status", "Checked"]);

        for result in results {
            table.add_row(vec![
                Cell::new(result.address.as_str()),
                Self::status_cell(result.is_present),
                Cell::new(result.checked_at.format(TIME_FORMAT).to_string()),
            ]);
        }

        let present = results.iter().filter(|r| r.is_present).count();
        format!(
            "{}\n\n{} of {} device(s) present",
            table,
            present,
            results.len()
        )
    }

    fn format_event(&self, event: &PresenceEvent) -> String {
        let now = chrono::Local::now().format(TIME_FORMAT).to_string();

        match event {
            PresenceEvent::PingResult(result) => {
                let status = if result.is_present {
                    "reachable".green()
                } else {
                    "unreachable".dimmed()
                };
                format!("{} {:<20} {}", now.dimmed(), result.address, status)
            }
            PresenceEvent::Present { address } => {
                format!("{} {} (via {})", now.dimmed(), "PRESENT".green().bold(), address)
            }
            PresenceEvent::NotPresent { address } => {
                format!(
                    "{} {} (last: {})",
                    now.dimmed(),
                    "NOT PRESENT".red().bold(),
                    address
                )
            }
        }
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}
