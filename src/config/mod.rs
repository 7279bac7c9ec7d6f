//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), optional
//!     → loader.rs (parse & deserialize, or defaults)
//!     → CLI flag overrides (binaries)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig / NodeConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    CacheConfig, LimitsConfig, ListenerConfig, NodeConfig, ObservabilityConfig, ProxyConfig,
    ReplicationConfig, TimeoutConfig, UpstreamConfig,
};
pub use validation::{Validate, ValidationError};
