//! Caching proxy dispatch.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → dispatcher.rs (classify method, key = METHOD:path?query)
//!     → GET: cache hit → 200 cached body
//!     → GET miss: pick_for_read → forward → cache 2xx body → relay
//!     → PUT/POST/DELETE: invalidation.rs key → cache delete
//!                        → pick_for_write → forward → relay
//!     → anything else: 405
//! ```
//!
//! # Design Decisions
//! - No retries or failover: a transport error is a 502
//! - Invalidation failures never block the write

pub mod dispatcher;
pub mod invalidation;

pub use dispatcher::{Dispatcher, ForwardError, MethodClass};
pub use invalidation::{cache_key, employee_read_key, invalidation_key, InvalidationError};
