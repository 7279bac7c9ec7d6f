//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy request classified as read or write
//!     → pool.rs
//!         - write: first configured primary
//!         - read:  round_robin.rs over replicas (primary if none)
//!     → backend.rs (endpoint URL for forwarding)
//! ```
//!
//! # Design Decisions
//! - Selection is stateless apart from one shared rotation counter
//! - No health tracking: a dead replica keeps its turn in the rotation
//! - No failover: the picked backend is the only one tried

pub mod backend;
pub mod pool;
pub mod round_robin;

use std::fmt::Debug;
use std::sync::Arc;

pub use backend::Backend;
pub use pool::{BackendPool, PoolError};
pub use round_robin::RoundRobin;

/// A backend selection strategy.
pub trait LoadBalancer: Send + Sync + Debug {
    /// Pick the next backend, or `None` if `backends` is empty.
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}
