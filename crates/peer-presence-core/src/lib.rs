//! Presence detection for wireless peer devices.
//!
//! Periodically probes each registered device through an external
//! reachability tool (`l2ping` by default) and folds the results into one
//! collective signal: present while at least one device answers.
//!
//! ```no_run
//! use peer_presence_core::{PresenceEvent, PresenceScanner};
//!
//! # async fn demo() -> peer_presence_core::Result<()> {
//! let scanner = PresenceScanner::default();
//! scanner.set_devices(["AA:BB:CC:DD:EE:FF"]).await;
//!
//! let mut events = scanner.subscribe();
//! scanner.start(true).await?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let PresenceEvent::Present { address } = event {
//!         println!("{} is home", address);
//!     }
//! }
//! scanner.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod presence;
pub mod probe;
pub mod scanner;
pub mod types;

pub use config::ScannerConfig;
pub use error::{CoreError, Result};
pub use probe::ProbeCommand;
pub use scanner::{PresenceScanner, ScanState};
pub use types::{DeviceId, PingOptions, PingOptionsUpdate, PingResult, PresenceEvent};
