//! Storage node subsystem.
//!
//! # Data Flow
//! ```text
//! client or proxy
//!     → server.rs (role filter: 403 before any handler)
//!     → handlers.rs (parse id, query or JSON body)
//!     → RecordStore (primary: writes, replica: reads)
//!     → JSON body or {"error": ...}
//! ```
//!
//! # Design Decisions
//! - The role filter covers every path, `/health` included
//! - Wrong methods and bad query strings still answer JSON
//! - A replica node only changes through its replicator

pub mod handlers;
pub mod server;

pub use server::{NodeServer, NodeState};
