//! Record store subsystem.
//!
//! # Data Flow
//! ```text
//! node handler (GET/PUT/POST/DELETE)
//!     → record_store.rs (role check, then the store gate)
//!     → SQLite connection on the blocking pool
//!     → Employees row + ReplicationLog entry (primary only)
//!
//! Replication (replica only):
//!     replicator → record_store.rs apply_snapshot
//!     → gate + one transaction: DELETE all, INSERT fetched rows
//! ```
//!
//! # Design Decisions
//! - Role is fixed when the store is opened
//! - Every operation, reads included, passes through one gate per store
//! - The change log is an audit trail; replication never reads it

pub mod record_store;
pub mod types;

use std::fmt;
use serde::{Deserialize, Serialize};

pub use record_store::RecordStore;
pub use types::{ChangeLogEntry, Employee, NewEmployee, Operation};

/// Role of a record store, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Accepts mutations, rejects reads.
    Primary,
    /// Serves reads, rejects mutations; refreshed by the replicator.
    Replica,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Primary => write!(f, "Primary"),
            Role::Replica => write!(f, "Replica"),
        }
    }
}

/// Errors raised by record store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{role} store cannot perform {operation}: {hint}")]
    RoleViolation {
        role: Role,
        operation: &'static str,
        hint: &'static str,
    },

    #[error("Employee {0} not found")]
    NotFound(i64),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Unknown change-log operation '{0}'")]
    UnknownOperation(String),

    #[error("Store task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub(crate) fn role_violation(role: Role, operation: &'static str) -> Self {
        let hint = match role {
            Role::Primary => "reads are served by replica nodes",
            Role::Replica => "writes must go to the primary node",
        };
        StoreError::RoleViolation { role, operation, hint }
    }
}
