//! Launches one probe process per device and classifies its outcome.
//!
//! Classification follows stream activity rather than the exit status: the
//! first bytes written to stdout mean the peer answered, the first bytes on
//! stderr mean it did not. The tool writes as soon as it knows, so this
//! reports a responding peer without waiting for the full timeout.

use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::pool::ProbePool;
use super::ProbeCommand;
use crate::error::ProbeError;
use crate::types::{DeviceId, PingOptions, PingResult};

/// Read buffer size for probe output. Content is never inspected.
const READ_CHUNK: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Runs reachability probes and reports one `PingResult` per probe.
#[derive(Debug, Clone)]
pub struct ProbeRunner {
    command: ProbeCommand,
    pool: ProbePool,
}

impl ProbeRunner {
    pub fn new(command: ProbeCommand, pool: ProbePool) -> Self {
        Self { command, pool }
    }

    pub fn pool(&self) -> &ProbePool {
        &self.pool
    }

    /// Start a probe for `address` and return once the process is running.
    ///
    /// The result is sent on `results` exactly once, unless the probe is
    /// killed through the pool first. A launch failure is returned directly.
    pub async fn launch(
        &self,
        address: &DeviceId,
        options: &PingOptions,
        results: mpsc::UnboundedSender<PingResult>,
    ) -> Result<(), ProbeError> {
        let child = Command::new(&self.command.program)
            .args(&self.command.args)
            .args(probe_args(address, options))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProbeError::Launch {
                address: address.to_string(),
                source,
            })?;

        let (handle, kill_rx) = self.pool.handle_for(address.clone(), child.id());
        let id = handle.id();
        self.pool.track(handle).await;

        debug!("Probe #{} launched for {}", id, address);

        let pool = self.pool.clone();
        let address = address.clone();
        tokio::spawn(async move {
            drive_probe(child, &address, kill_rx, &results).await;
            pool.untrack(id).await;
            debug!("Probe #{} for {} finished", id, address);
        });

        Ok(())
    }
}

/// Per-probe arguments: `-c <count> -t <timeout> <address>`.
pub fn probe_args(address: &DeviceId, options: &PingOptions) -> Vec<String> {
    vec![
        "-c".to_string(),
        options.count.to_string(),
        "-t".to_string(),
        options.timeout_secs.to_string(),
        address.to_string(),
    ]
}

/// Own the child process until it exits or is killed.
async fn drive_probe(
    mut child: Child,
    address: &DeviceId,
    mut kill_rx: oneshot::Receiver<()>,
    results: &mpsc::UnboundedSender<PingResult>,
) {
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out_buf = [0u8; READ_CHUNK];
    let mut err_buf = [0u8; READ_CHUNK];
    let mut classified = false;

    while stdout.is_some() || stderr.is_some() {
        let (stream, read) = tokio::select! {
            _ = &mut kill_rx => {
                terminate(&mut child, address).await;
                return;
            }
            read = read_chunk(&mut stdout, &mut out_buf) => (Stream::Stdout, read),
            read = read_chunk(&mut stderr, &mut err_buf) => (Stream::Stderr, read),
        };

        match read {
            Ok(n) if n > 0 => {
                // Later output, on either stream, is drained and ignored.
                if !classified {
                    classified = true;
                    report(results, address, stream == Stream::Stdout);
                }
            }
            _ => match stream {
                Stream::Stdout => stdout = None,
                Stream::Stderr => stderr = None,
            },
        }
    }

    tokio::select! {
        _ = &mut kill_rx => {
            terminate(&mut child, address).await;
            return;
        }
        status = child.wait() => {
            debug!("Probe for {} exited: {:?}", address, status);
        }
    }

    if !classified {
        debug!("Probe for {} exited without output", address);
        report(results, address, false);
    }
}

async fn read_chunk<R>(stream: &mut Option<R>, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match stream {
        Some(stream) => stream.read(buf).await,
        None => std::future::pending().await,
    }
}

fn report(results: &mpsc::UnboundedSender<PingResult>, address: &DeviceId, is_present: bool) {
    debug!(
        "Probe classified {} as {}",
        address,
        if is_present { "present" } else { "absent" }
    );
    // The receiver is gone once scanning stops; late results are dropped.
    let _ = results.send(PingResult::new(address.clone(), is_present));
}

async fn terminate(child: &mut Child, address: &DeviceId) {
    debug!("Killing probe for {}", address);
    if let Err(e) = child.kill().await {
        debug!("Probe for {} was already gone: {}", address, e);
    }
}
