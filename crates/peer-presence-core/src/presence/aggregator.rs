//! Presence state machine.
//!
//! The collective signal is "present" while at least one device answered its
//! most recent probe. A notification fires on each edge of that signal, and
//! once unconditionally for the first result after `start` when the
//! first-result latch is armed.

use std::collections::BTreeSet;

use tracing::info;

use crate::types::{DeviceId, PingResult, PresenceEvent};

#[derive(Debug, Default)]
pub struct PresenceAggregator {
    present: BTreeSet<DeviceId>,
    report_first_result: bool,
}

impl PresenceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm or disarm the one-shot first-result latch.
    pub fn arm(&mut self, report_first_result: bool) {
        self.report_first_result = report_first_result;
    }

    #[cfg(test)]
    fn is_armed(&self) -> bool {
        self.report_first_result
    }

    /// Fold one result into the presence set.
    ///
    /// Returns the raw `PingResult` event followed by at most one
    /// `Present`/`NotPresent` notification.
    pub fn fold(&mut self, result: PingResult) -> Vec<PresenceEvent> {
        let was_present = self.is_present();
        let address = result.address.clone();

        if result.is_present {
            self.present.insert(address.clone());
        } else {
            self.present.remove(&address);
        }

        let is_present_now = self.is_present();
        let report_first = std::mem::take(&mut self.report_first_result);

        let mut events = vec![PresenceEvent::PingResult(result)];

        if is_present_now {
            if !was_present || report_first {
                info!("Presence: present ({})", address);
                events.push(PresenceEvent::Present { address });
            }
        } else if was_present || report_first {
            info!("Presence: not present ({})", address);
            events.push(PresenceEvent::NotPresent { address });
        }

        events
    }

    /// Collective signal.
    pub fn is_present(&self) -> bool {
        !self.present.is_empty()
    }

    /// Devices whose latest probe succeeded.
    pub fn present_devices(&self) -> Vec<DeviceId> {
        self.present.iter().cloned().collect()
    }
}
