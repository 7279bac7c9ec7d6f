//! Replicated employee warehouse behind a caching reverse proxy.

// Storage
pub mod cache;
pub mod replication;
pub mod store;

// Serving
pub mod http;
pub mod load_balancer;
pub mod node;
pub mod proxy;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::schema::{NodeConfig, ProxyConfig};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use node::NodeServer;
pub use store::{RecordStore, Role};
