//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (binaries):
//!     Load config → Validate → Open stores/cache → Spawn background tasks → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → flag set → servers drain, replicator and sweeper exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Background loops select on a ShutdownListener between cycles
//! - The flag is latched, so a task started after the signal exits at once

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownListener};
pub use signals::spawn_signal_listener;
