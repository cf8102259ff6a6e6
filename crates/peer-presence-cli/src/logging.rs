//! Diagnostic logging setup.
//!
//! Logs go to stderr so stdout carries only command output. `RUST_LOG`
//! takes precedence over `--verbose`.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
