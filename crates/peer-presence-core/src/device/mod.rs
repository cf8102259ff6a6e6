//! Device bookkeeping.
//!
//! Holds the set of peers the scanner probes on every cycle.

pub mod registry;

pub use registry::DeviceRegistry;
