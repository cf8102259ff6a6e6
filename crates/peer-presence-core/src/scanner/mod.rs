//! Scan scheduling and the public scanner API.

pub mod service;

pub use service::{PresenceScanner, ScanState, DEFAULT_SCAN_INTERVAL_SECS};
