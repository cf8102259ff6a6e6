//! Watch command implementation.

use std::future::Future;
use std::io::{self, Write};

use peer_presence_core::{PresenceEvent, ScanState, ScannerConfig};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tracing::warn;

use super::apply_overrides;
use crate::cli::WatchArgs;
use crate::error::{CliError, Result};
use crate::output::{get_formatter, OutputFormatter};

/// Run the watch command
pub async fn run_watch(args: WatchArgs, mut config: ScannerConfig, json: bool) -> Result<()> {
    let formatter = get_formatter(json);
    apply_overrides(&mut config, args.devices, &args.ping)?;
    if let Some(interval) = args.interval {
        config.interval_secs = interval;
    }
    let report_first_result = config.report_first_result && !args.quiet_start;

    let scanner = config.build_scanner().await;
    let mut events = scanner.subscribe();
    let mut state = scanner.watch_state();

    scanner.start(report_first_result).await?;

    if !json {
        println!(
            "Watching {} device(s) every {}s (press Ctrl+C to stop)...\n",
            scanner.devices().await.len(),
            scanner.interval_seconds().await
        );
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let outcome = stream_events(&mut events, &mut state, formatter.as_ref(), shutdown).await;

    scanner.stop().await;
    outcome
}

/// Print events until `shutdown` completes or scanning fails.
async fn stream_events(
    events: &mut broadcast::Receiver<PresenceEvent>,
    state: &mut watch::Receiver<ScanState>,
    formatter: &dyn OutputFormatter,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => return Ok(()),
            event = events.recv() => match event {
                Ok(event) => {
                    println!("{}", formatter.format_event(&event));
                    io::stdout().flush().ok();
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Output fell behind, {} event(s) skipped", skipped);
                }
                Err(RecvError::Closed) => return Ok(()),
            },
            changed = state.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let current = state.borrow_and_update().clone();
                if let ScanState::Failed(message) = current {
                    return Err(CliError::ScanFailed(message));
                }
            }
        }
    }
}
