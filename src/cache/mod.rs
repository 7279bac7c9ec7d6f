//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! proxy read (GET):
//!     store.rs get → sweep expired → lookup → hit | miss
//!     miss → backend → store.rs set (write-through on 2xx)
//!
//! proxy write (PUT/POST/DELETE):
//!     store.rs delete(GET:/employee/{id})
//!
//! background:
//!     sweeper.rs → store.rs cleanup_expired every interval
//! ```
//!
//! # Design Decisions
//! - Entries are derived data; any failure degrades to a miss
//! - Expiry boundary: age >= TTL is expired, in lookups and sweeps alike
//! - Time comes from a `Clock` so expiry is testable

pub mod clock;
pub mod store;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{ResponseCache, DEFAULT_TTL};
pub use sweeper::{CacheSweeper, DEFAULT_CLEANUP_INTERVAL};

/// Errors raised by the response cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cache connection lock poisoned")]
    Poisoned,

    #[error("Cache task failed: {0}")]
    Task(String),
}
