//! Folding of per-device probe results into one presence signal.

pub mod aggregator;

pub use aggregator::PresenceAggregator;
