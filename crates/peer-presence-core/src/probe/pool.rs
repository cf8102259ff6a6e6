//! Registry of probe processes currently in flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex, Notify};
use tracing::{debug, warn};

use crate::types::DeviceId;

/// Upper bound on how long `kill_all` waits for probes to exit.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// One in-flight probe process.
///
/// The process itself is owned by the task driving it; the handle carries
/// the trigger that asks that task to kill it.
#[derive(Debug)]
pub struct ProbeHandle {
    id: u64,
    address: DeviceId,
    pid: Option<u32>,
    kill: Option<oneshot::Sender<()>>,
}

impl ProbeHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn address(&self) -> &DeviceId {
        &self.address
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

/// Shared set of in-flight probes.
///
/// Cheap to clone; every clone refers to the same set.
#[derive(Debug, Clone, Default)]
pub struct ProbePool {
    handles: Arc<Mutex<HashMap<u64, ProbeHandle>>>,
    next_id: Arc<AtomicU64>,
    /// Signalled whenever the last tracked probe is untracked.
    drained: Arc<Notify>,
}

impl ProbePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a handle for a freshly spawned process.
    ///
    /// Returns the handle to track and the receiver the driving task listens
    /// on for a kill request.
    pub fn handle_for(
        &self,
        address: DeviceId,
        pid: Option<u32>,
    ) -> (ProbeHandle, oneshot::Receiver<()>) {
        let (kill, kill_rx) = oneshot::channel();
        let handle = ProbeHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            address,
            pid,
            kill: Some(kill),
        };
        (handle, kill_rx)
    }

    pub async fn track(&self, handle: ProbeHandle) {
        debug!(
            "Tracking probe #{} for {} (pid {:?})",
            handle.id, handle.address, handle.pid
        );
        self.handles.lock().await.insert(handle.id, handle);
    }

    /// Drop a handle once its process has exited.
    pub async fn untrack(&self, id: u64) -> Option<ProbeHandle> {
        let mut handles = self.handles.lock().await;
        let removed = handles.remove(&id);
        if handles.is_empty() {
            self.drained.notify_waiters();
        }
        removed
    }

    /// Ask every tracked probe to terminate and wait until they have exited.
    ///
    /// Handles whose process does not report back within `DRAIN_TIMEOUT` are
    /// dropped, so the pool is always empty afterwards.
    pub async fn kill_all(&self) {
        let signalled = {
            let mut handles = self.handles.lock().await;
            let mut signalled = 0;
            for handle in handles.values_mut() {
                // The driving task may already be gone; nothing left to kill then.
                if let Some(kill) = handle.kill.take() {
                    let _ = kill.send(());
                    signalled += 1;
                }
            }
            signalled
        };

        if signalled == 0 && self.is_empty().await {
            return;
        }

        debug!("Killing {} in-flight probe(s)", signalled);
        if tokio::time::timeout(DRAIN_TIMEOUT, self.wait_exited())
            .await
            .is_err()
        {
            let mut handles = self.handles.lock().await;
            warn!("{} probe(s) did not exit after kill", handles.len());
            handles.clear();
        }
    }

    pub async fn len(&self) -> usize {
        self.handles.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.handles.lock().await.is_empty()
    }

    /// Addresses with a probe in flight, sorted.
    pub async fn tracked(&self) -> Vec<DeviceId> {
        let mut addresses: Vec<DeviceId> = self
            .handles
            .lock()
            .await
            .values()
            .map(|handle| handle.address.clone())
            .collect();
        addresses.sort();
        addresses
    }

    async fn wait_exited(&self) {
        loop {
            let drained = self.drained.notified();
            tokio::pin!(drained);
            // Register before checking so an untrack in between is not missed.
            drained.as_mut().enable();

            if self.is_empty().await {
                return;
            }
            drained.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_track_and_untrack() {
        let pool = ProbePool::new();
        let (handle, _kill_rx) = pool.handle_for(DeviceId::new("AA"), Some(42));
        let id = handle.id();
        pool.track(handle).await;

        assert_eq!(pool.len().await, 1);
        assert_eq!(pool.tracked().await, vec![DeviceId::new("aa")]);

        let removed = pool.untrack(id).await.unwrap();
        assert_eq!(removed.pid(), Some(42));
        assert!(pool.is_empty().await);
        assert!(pool.untrack(id).await.is_none());
    }

    #[tokio::test]
    async fn test_kill_all_signals_every_probe() {
        let pool = ProbePool::new();
        let mut drivers = Vec::new();

        for name in ["a", "b"] {
            let (handle, kill_rx) = pool.handle_for(DeviceId::new(name), None);
            let id = handle.id();
            pool.track(handle).await;

            // Stand-in for the task that owns the process.
            let pool = pool.clone();
            drivers.push(tokio::spawn(async move {
                let killed = kill_rx.await.is_ok();
                pool.untrack(id).await;
                killed
            }));
        }

        pool.kill_all().await;

        assert!(pool.is_empty().await);
        for driver in drivers {
            assert!(driver.await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_kill_all_returns_when_last_probe_exits() {
        let pool = ProbePool::new();
        let (handle, kill_rx) = pool.handle_for(DeviceId::new("slow"), None);
        let id = handle.id();
        pool.track(handle).await;

        let driver = {
            let pool = pool.clone();
            tokio::spawn(async move {
                kill_rx.await.ok();
                tokio::time::sleep(Duration::from_millis(300)).await;
                pool.untrack(id).await;
            })
        };

        let started = std::time::Instant::now();
        pool.kill_all().await;
        let elapsed = started.elapsed();

        assert!(pool.is_empty().await);
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < DRAIN_TIMEOUT);
        driver.await.unwrap();
    }

    #[tokio::test]
    async fn test_kill_all_drops_unresponsive_handles() {
        let pool = ProbePool::new();
        let (handle, _kill_rx) = pool.handle_for(DeviceId::new("stuck"), None);
        pool.track(handle).await;

        pool.kill_all().await;

        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn test_kill_all_on_empty_pool() {
        let pool = ProbePool::new();
        pool.kill_all().await;
        assert!(pool.is_empty().await);
    }
}
