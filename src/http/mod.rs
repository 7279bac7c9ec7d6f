//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, timeout and body limit)
//!     → request.rs (request ID, trace span)
//!     → proxy dispatcher or node handlers
//!     → response.rs (JSON bodies, error mapping)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id_of, with_request_tracing, MakeRequestUuidV4, X_REQUEST_ID};
pub use response::{json_body, ApiError, ErrorBody};
pub use server::{HttpServer, StartupError};
