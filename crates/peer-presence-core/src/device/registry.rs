//! De-duplicated, case-normalized set of devices to scan.

use std::collections::BTreeSet;

use crate::types::DeviceId;

/// Set of device identifiers probed on each scan cycle.
///
/// Backed by a `BTreeSet` so `list()` is stable between calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRegistry {
    devices: BTreeSet<DeviceId>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add identifiers, collapsing duplicates.
    pub fn add<I, S>(&mut self, identifiers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.devices.extend(identifiers.into_iter().map(DeviceId::new));
    }

    /// Remove identifiers; unknown ones are ignored.
    pub fn remove<I, S>(&mut self, identifiers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in identifiers.into_iter().map(DeviceId::new) {
            self.devices.remove(&id);
        }
    }

    /// Replace the whole set.
    pub fn replace<I, S>(&mut self, identifiers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.devices = identifiers.into_iter().map(DeviceId::new).collect();
    }

    pub fn list(&self) -> Vec<DeviceId> {
        self.devices.iter().cloned().collect()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.devices.contains(&DeviceId::new(identifier))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
