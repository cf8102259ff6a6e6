//! Periodic presence scanner.
//!
//! `PresenceScanner` owns the device registry, probe options and scan
//! interval, and runs the scan loop on a background task. The loop is the
//! only place results are aggregated: it selects over the stop signal, the
//! re-arm timer and incoming probe results, so timer and result handling
//! never overlap.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::device::DeviceRegistry;
use crate::error::{CoreError, ProbeError};
use crate::presence::PresenceAggregator;
use crate::probe::{AvailabilityGate, ProbeCommand, ProbePool, ProbeRunner};
use crate::types::{DeviceId, PingOptions, PingOptionsUpdate, PingResult, PresenceEvent};

/// Default time between scan cycles, in seconds.
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 15;

/// Events buffered per subscriber before slow subscribers start lagging.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Lifecycle of the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "kebab-case")]
pub enum ScanState {
    /// Never started, or stopped
    Idle,
    /// Waiting for the probe tool lookup
    CheckingAvailability,
    /// Scan loop running
    Scanning,
    /// Halted by a fatal probe error
    Failed(String),
}

/// State shared between the scanner handle and its scan loop.
struct Shared {
    devices: RwLock<DeviceRegistry>,
    ping_options: RwLock<PingOptions>,
    interval_secs: RwLock<u64>,
    aggregator: Mutex<PresenceAggregator>,
    runner: ProbeRunner,
    gate: AvailabilityGate,
    events: broadcast::Sender<PresenceEvent>,
    state: watch::Sender<ScanState>,
}

struct ScanTask {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Presence detection for a set of wireless peers.
///
/// Lifecycle: `new` → `start` → `stop`. Call `stop` before dropping a
/// running scanner so in-flight probe processes are killed.
pub struct PresenceScanner {
    shared: Arc<Shared>,
    task: Mutex<Option<ScanTask>>,
}

impl PresenceScanner {
    pub fn new(command: ProbeCommand) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state, _) = watch::channel(ScanState::Idle);

        Self {
            shared: Arc::new(Shared {
                devices: RwLock::new(DeviceRegistry::new()),
                ping_options: RwLock::new(PingOptions::default()),
                interval_secs: RwLock::new(DEFAULT_SCAN_INTERVAL_SECS),
                aggregator: Mutex::new(PresenceAggregator::new()),
                runner: ProbeRunner::new(command.clone(), ProbePool::new()),
                gate: AvailabilityGate::new(command),
                events,
                state,
            }),
            task: Mutex::new(None),
        }
    }

    // ==================== Devices ====================

    pub async fn add_devices<I, S>(&self, identifiers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.shared.devices.write().await.add(identifiers);
    }

    pub async fn remove_devices<I, S>(&self, identifiers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.shared.devices.write().await.remove(identifiers);
    }

    /// Replace the registered devices. Takes effect on the next cycle.
    pub async fn set_devices<I, S>(&self, identifiers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.shared.devices.write().await.replace(identifiers);
    }

    pub async fn devices(&self) -> Vec<DeviceId> {
        self.shared.devices.read().await.list()
    }

    // ==================== Options ====================

    pub async fn ping_options(&self) -> PingOptions {
        *self.shared.ping_options.read().await
    }

    /// Replace the probe options; unset or zero fields use the defaults.
    pub async fn set_ping_options(&self, update: PingOptionsUpdate) {
        *self.shared.ping_options.write().await = PingOptions::from_update(update);
    }

    pub async fn interval_seconds(&self) -> u64 {
        *self.shared.interval_secs.read().await
    }

    /// Set the scan interval, applied at the next re-arm. Zero selects the default.
    pub async fn set_interval_seconds(&self, seconds: u64) {
        let seconds = if seconds == 0 {
            DEFAULT_SCAN_INTERVAL_SECS
        } else {
            seconds
        };
        *self.shared.interval_secs.write().await = seconds;
    }

    // ==================== Lifecycle ====================

    /// Check the probe tool (first run only) and start scanning.
    ///
    /// `report_first_result` makes the first result after this call produce
    /// a notification even if the collective signal did not change. Calling
    /// `start` while already scanning does nothing.
    pub async fn start(&self, report_first_result: bool) -> Result<(), CoreError> {
        let mut task = self.task.lock().await;

        if let Some(running) = task.as_ref() {
            if !running.handle.is_finished() {
                debug!("Scanner already running");
                return Ok(());
            }
        }
        *task = None;

        if !self.shared.gate.is_confirmed() {
            self.shared.set_state(ScanState::CheckingAvailability);
            if let Err(e) = self.shared.gate.ensure().await {
                error!("Cannot start scanning: {}", e);
                self.shared.set_state(ScanState::Failed(e.to_string()));
                return Err(e.into());
            }
        }

        self.shared.aggregator.lock().await.arm(report_first_result);

        let (stop, stop_rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        self.shared.set_state(ScanState::Scanning);
        let handle = tokio::spawn(shared.run(stop_rx));
        *task = Some(ScanTask { stop, handle });

        info!(
            "Scanning started (interval: {}s, report first result: {})",
            self.interval_seconds().await,
            report_first_result
        );
        Ok(())
    }

    /// Stop scanning and kill every in-flight probe. Idempotent.
    pub async fn stop(&self) {
        let task = self.task.lock().await.take();

        if let Some(task) = task {
            // The loop is gone already if it hit a fatal error.
            let _ = task.stop.send(());
            if let Err(e) = task.handle.await {
                warn!("Scan loop ended abnormally: {}", e);
            }
            info!("Scanning stopped");
        }

        self.shared.runner.pool().kill_all().await;
        self.shared.set_state(ScanState::Idle);
    }

    /// Probe every registered device once, outside the scan loop.
    ///
    /// Runs the availability check if needed and waits for all results.
    /// Results are not aggregated and no events are published.
    pub async fn probe_once(&self) -> Result<Vec<PingResult>, CoreError> {
        self.shared.gate.ensure().await?;

        let devices = self.devices().await;
        let options = self.ping_options().await;
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();

        for address in &devices {
            self.shared
                .runner
                .launch(address, &options, results_tx.clone())
                .await?;
        }
        drop(results_tx);

        let mut results = Vec::with_capacity(devices.len());
        while let Some(result) = results_rx.recv().await {
            results.push(result);
        }
        results.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(results)
    }

    // ==================== Observation ====================

    /// Subscribe to `ping-result`, `present` and `not-present` events.
    pub fn subscribe(&self) -> broadcast::Receiver<PresenceEvent> {
        self.shared.events.subscribe()
    }

    pub fn state(&self) -> ScanState {
        self.shared.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<ScanState> {
        self.shared.state.subscribe()
    }

    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .map(|task| !task.handle.is_finished())
            .unwrap_or(false)
    }

    /// Collective signal: at least one device answered its latest probe.
    pub async fn is_present(&self) -> bool {
        self.shared.aggregator.lock().await.is_present()
    }

    pub async fn present_devices(&self) -> Vec<DeviceId> {
        self.shared.aggregator.lock().await.present_devices()
    }

    /// Devices with a probe process currently running.
    pub async fn in_flight(&self) -> Vec<DeviceId> {
        self.shared.runner.pool().tracked().await
    }
}

impl Default for PresenceScanner {
    fn default() -> Self {
        Self::new(ProbeCommand::default())
    }
}

impl Shared {
    fn set_state(&self, state: ScanState) {
        self.state.send_replace(state);
    }

    /// Scan loop: dispatch a cycle, then aggregate results until the re-arm
    /// timer fires or stop is requested.
    async fn run(self: Arc<Self>, mut stop_rx: oneshot::Receiver<()>) {
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();
        let mut cycle: u64 = 0;

        loop {
            cycle += 1;
            if let Err(e) = self.dispatch(cycle, &results_tx).await {
                error!("Scan #{} failed, scanning halted: {}", cycle, e);
                self.runner.pool().kill_all().await;
                self.set_state(ScanState::Failed(e.to_string()));
                return;
            }

            let interval = Duration::from_secs(*self.interval_secs.read().await);
            let rearm = tokio::time::sleep(interval);
            tokio::pin!(rearm);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => return,
                    _ = &mut rearm => break,
                    Some(result) = results_rx.recv() => self.aggregate(result).await,
                }
            }
        }
    }

    /// Launch one probe per registered device without waiting for results.
    async fn dispatch(
        &self,
        cycle: u64,
        results_tx: &mpsc::UnboundedSender<PingResult>,
    ) -> Result<(), ProbeError> {
        let devices = self.devices.read().await.list();
        if devices.is_empty() {
            debug!("Scan #{}: no devices registered", cycle);
            return Ok(());
        }

        let options = *self.ping_options.read().await;
        debug!("Scan #{}: probing {} device(s)", cycle, devices.len());

        for address in &devices {
            self.runner
                .launch(address, &options, results_tx.clone())
                .await?;
        }
        Ok(())
    }

    async fn aggregate(&self, result: PingResult) {
        let events = self.aggregator.lock().await.fold(result);
        for event in events {
            // No subscribers is not an error.
            let _ = self.events.send(event);
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::probe::runner::tests::script_command;

    const WAIT: Duration = Duration::from_secs(5);

    async fn next_event(rx: &mut broadcast::Receiver<PresenceEvent>) -> PresenceEvent {
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for event")
            .unwrap()
    }

    async fn wait_for_state(scanner: &PresenceScanner, predicate: impl Fn(&ScanState) -> bool) {
        let mut state = scanner.watch_state();
        tokio::time::timeout(WAIT, state.wait_for(|s| predicate(s)))
            .await
            .expect("timed out waiting for state")
            .unwrap();
    }

    /// Count `ping-result` events received before `deadline`.
    async fn count_ping_results(
        rx: &mut broadcast::Receiver<PresenceEvent>,
        deadline: tokio::time::Instant,
    ) -> usize {
        let mut count = 0;
        while let Ok(Ok(event)) = tokio::time::timeout_at(deadline, rx.recv()).await {
            if matches!(event, PresenceEvent::PingResult(_)) {
                count += 1;
            }
        }
        count
    }

    #[tokio::test]
    async fn test_registry_operations() {
        let scanner = PresenceScanner::default();

        scanner.add_devices(["AA:BB", "aa:bb", "cc:dd"]).await;
        assert_eq!(scanner.devices().await.len(), 2);

        scanner.remove_devices(["CC:DD"]).await;
        scanner.set_devices(["ee:ff"]).await;
        assert_eq!(scanner.devices().await, vec![DeviceId::new("ee:ff")]);
    }

    #[tokio::test]
    async fn test_option_and_interval_defaults() {
        let scanner = PresenceScanner::default();
        assert_eq!(scanner.ping_options().await, PingOptions::default());
        assert_eq!(scanner.interval_seconds().await, DEFAULT_SCAN_INTERVAL_SECS);

        scanner
            .set_ping_options(PingOptionsUpdate {
                count: Some(0),
                timeout_secs: Some(2.0),
            })
            .await;
        assert_eq!(
            scanner.ping_options().await,
            PingOptions {
                count: 1,
                timeout_secs: 2.0
            }
        );

        scanner.set_interval_seconds(3).await;
        assert_eq!(scanner.interval_seconds().await, 3);
        scanner.set_interval_seconds(0).await;
        assert_eq!(scanner.interval_seconds().await, DEFAULT_SCAN_INTERVAL_SECS);
    }

    #[tokio::test]
    async fn test_start_fails_when_tool_missing() {
        let scanner = PresenceScanner::new(ProbeCommand {
            program: "l2ping".to_string(),
            args: Vec::new(),
            lookup: "false".to_string(),
        });

        let err = scanner.start(true).await.unwrap_err();

        assert!(matches!(
            err,
            CoreError::Probe(ProbeError::Unavailable { .. })
        ));
        assert!(matches!(scanner.state(), ScanState::Failed(_)));
        assert!(!scanner.is_running().await);
    }

    #[tokio::test]
    async fn test_empty_registry_scans_quietly() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = PresenceScanner::new(script_command(dir.path(), "ok.sh", "echo ok\n"));
        let mut events = scanner.subscribe();

        scanner.start(true).await.unwrap();
        assert_eq!(scanner.state(), ScanState::Scanning);
        assert!(scanner.is_running().await);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        scanner.stop().await;
        assert_eq!(scanner.state(), ScanState::Idle);
        scanner.stop().await;
        assert_eq!(scanner.state(), ScanState::Idle);
    }

    #[tokio::test]
    async fn test_present_device_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = PresenceScanner::new(script_command(dir.path(), "ok.sh", "echo ok\n"));
        scanner.set_devices(["AA:BB"]).await;
        let mut events = scanner.subscribe();

        scanner.start(false).await.unwrap();

        match next_event(&mut events).await {
            PresenceEvent::PingResult(result) => {
                assert_eq!(result.address, DeviceId::new("aa:bb"));
                assert!(result.is_present);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(
            next_event(&mut events).await,
            PresenceEvent::Present {
                address: DeviceId::new("aa:bb")
            }
        );
        assert!(scanner.is_present().await);
        assert_eq!(scanner.present_devices().await, vec![DeviceId::new("aa:bb")]);

        scanner.stop().await;
    }

    #[tokio::test]
    async fn test_first_result_latch_reports_absence() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = PresenceScanner::new(script_command(
            dir.path(),
            "absent.sh",
            "echo 'no response' >&2\n",
        ));
        scanner.set_devices(["aa:bb"]).await;
        let mut events = scanner.subscribe();

        scanner.start(true).await.unwrap();

        assert_eq!(next_event(&mut events).await.name(), "ping-result");
        assert_eq!(
            next_event(&mut events).await,
            PresenceEvent::NotPresent {
                address: DeviceId::new("aa:bb")
            }
        );
        assert!(!scanner.is_present().await);

        scanner.stop().await;
    }

    #[tokio::test]
    async fn test_stop_kills_outstanding_probes() {
        let dir = tempfile::tempdir().unwrap();
        let scanner =
            PresenceScanner::new(script_command(dir.path(), "slow.sh", "sleep 30\necho ok\n"));
        scanner.set_devices(["aa", "bb"]).await;
        scanner.set_interval_seconds(1).await;

        scanner.start(true).await.unwrap();

        tokio::time::timeout(WAIT, async {
            while scanner.in_flight().await.len() < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("probes never started");

        scanner.stop().await;
        assert!(scanner.in_flight().await.is_empty());
        assert_eq!(scanner.state(), ScanState::Idle);

        // Longer than the interval: nothing new is dispatched.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(scanner.in_flight().await.is_empty());
        assert!(!scanner.is_running().await);
    }

    #[tokio::test]
    async fn test_launch_failure_halts_scanning() {
        let scanner = PresenceScanner::new(ProbeCommand {
            program: "peer-presence-no-such-tool".to_string(),
            args: Vec::new(),
            lookup: "true".to_string(),
        });
        scanner.set_devices(["aa:bb"]).await;

        scanner.start(true).await.unwrap();

        wait_for_state(&scanner, |s| matches!(s, ScanState::Failed(_))).await;
        match scanner.state() {
            ScanState::Failed(message) => assert!(message.contains("aa:bb")),
            other => panic!("unexpected state: {:?}", other),
        }
        assert!(!scanner.is_running().await);

        scanner.stop().await;
        assert_eq!(scanner.state(), ScanState::Idle);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = PresenceScanner::new(script_command(dir.path(), "ok.sh", "echo ok\n"));

        scanner.start(true).await.unwrap();
        scanner.start(false).await.unwrap();
        assert!(scanner.is_running().await);

        scanner.stop().await;
        assert!(!scanner.is_running().await);
    }

    #[tokio::test]
    async fn test_probe_once_collects_every_device() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = PresenceScanner::new(script_command(
            dir.path(),
            "by_name.sh",
            "case \"$5\" in near) echo ok ;; *) echo gone >&2 ;; esac\n",
        ));
        scanner.set_devices(["NEAR", "far"]).await;

        let results = scanner.probe_once().await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].address, DeviceId::new("far"));
        assert!(!results[0].is_present);
        assert_eq!(results[1].address, DeviceId::new("near"));
        assert!(results[1].is_present);
        assert!(!scanner.is_present().await);
    }

    #[tokio::test]
    async fn test_cycles_repeat_every_interval() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = PresenceScanner::new(script_command(dir.path(), "ok.sh", "echo ok\n"));
        scanner.set_devices(["aa:bb"]).await;
        scanner.set_interval_seconds(1).await;
        let mut events = scanner.subscribe();

        let started = tokio::time::Instant::now();
        scanner.start(false).await.unwrap();

        // Cycles at 0s, 1s and 2s.
        let count =
            count_ping_results(&mut events, started + Duration::from_millis(2500)).await;
        assert!(count >= 3, "only {} result(s) in 2.5s", count);

        scanner.stop().await;
    }

    #[tokio::test]
    async fn test_interval_change_applies_at_next_rearm() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = PresenceScanner::new(script_command(dir.path(), "ok.sh", "echo ok\n"));
        scanner.set_devices(["aa:bb"]).await;
        scanner.set_interval_seconds(1).await;
        let mut events = scanner.subscribe();

        let started = tokio::time::Instant::now();
        scanner.start(false).await.unwrap();
        assert_eq!(next_event(&mut events).await.name(), "ping-result");

        // The 1s timer is already armed; the second cycle still follows it.
        scanner.set_interval_seconds(3).await;
        let count =
            count_ping_results(&mut events, started + Duration::from_millis(2500)).await;
        assert_eq!(count, 1);

        // Third cycle waits the new 3s after the second one.
        loop {
            if let PresenceEvent::PingResult(_) = next_event(&mut events).await {
                break;
            }
        }
        assert!(started.elapsed() >= Duration::from_millis(3500));

        scanner.stop().await;
    }

    #[tokio::test]
    async fn test_slow_probes_overlap_next_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let scanner =
            PresenceScanner::new(script_command(dir.path(), "slow.sh", "sleep 3\necho ok\n"));
        scanner.set_devices(["aa:bb"]).await;
        scanner.set_interval_seconds(1).await;

        scanner.start(true).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2200)).await;

        let in_flight = scanner.in_flight().await;
        assert!(in_flight.len() >= 2, "in flight: {:?}", in_flight);
        assert!(in_flight.iter().all(|id| id.as_str() == "aa:bb"));

        scanner.stop().await;
        assert!(scanner.in_flight().await.is_empty());
    }

    #[tokio::test]
    async fn test_restart_rearms_first_result_latch() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = PresenceScanner::new(script_command(
            dir.path(),
            "absent.sh",
            "echo 'no response' >&2\n",
        ));
        scanner.set_devices(["aa:bb"]).await;
        let mut events = scanner.subscribe();

        for _ in 0..2 {
            scanner.start(true).await.unwrap();
            assert_eq!(next_event(&mut events).await.name(), "ping-result");
            assert_eq!(
                next_event(&mut events).await,
                PresenceEvent::NotPresent {
                    address: DeviceId::new("aa:bb")
                }
            );
            scanner.stop().await;
        }
    }
}
