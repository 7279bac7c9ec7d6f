//! Replication subsystem.
//!
//! # Data Flow
//! ```text
//! every interval (replica process only):
//!     replicator.rs  Idle → Fetching
//!     → source.rs (primary's full record set, no delta)
//!     → replicator.rs  Fetching → Applying
//!     → RecordStore::apply_snapshot (gate + transaction)
//!     → Idle
//! ```
//!
//! # Design Decisions
//! - Full snapshot replace; the primary's change log is never consulted
//! - Fixed delay between cycles, no backoff, failures only logged
//! - Loop is bound to the shutdown flag

pub mod replicator;
pub mod source;

use crate::store::{Role, StoreError};

pub use replicator::{ReplicationPhase, Replicator, DEFAULT_SYNC_INTERVAL};
pub use source::{PrimaryFileSource, SnapshotSource};

/// Errors raised by a replication cycle.
#[derive(Debug, thiserror::Error)]
pub enum ReplicationError {
    #[error("{0} store cannot run a replicator")]
    NotAReplica(Role),

    #[error("Failed to fetch snapshot from primary: {0}")]
    Fetch(#[source] StoreError),

    #[error("Failed to apply snapshot to replica: {0}")]
    Apply(#[source] StoreError),
}
