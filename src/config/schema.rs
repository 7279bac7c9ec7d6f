//! Configuration schema definitions.
//!
//! This module defines the configuration of both processes: the caching proxy
//! and a warehouse node. All types derive Serde traits for deserialization
//! from TOML files, and every field has a default.

use std::path::PathBuf;
use serde::{Deserialize, Serialize};

use crate::store::Role;

/// Root configuration for the caching reverse proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Primary and replica endpoints.
    pub upstreams: UpstreamConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Backend endpoints, as `host:port` or `http://host:port`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Primary endpoints. Only the first receives writes.
    pub primaries: Vec<String>,

    /// Replica endpoints, rotated for reads in this order.
    pub replicas: Vec<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            primaries: vec!["127.0.0.1:8081".to_string()],
            replicas: vec!["127.0.0.1:8082".to_string()],
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// SQLite file holding cached responses.
    pub path: PathBuf,

    /// Entry lifetime in seconds.
    pub ttl_secs: u64,

    /// Background sweep period in seconds.
    pub cleanup_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("proxy_cache.db"),
            ttl_secs: 240,
            cleanup_interval_secs: 60,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Inbound request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request and relayed response body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024, // 1MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Root configuration for a warehouse node.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Bind address (e.g., "127.0.0.1:8081").
    pub bind_address: String,

    /// Primary or replica.
    pub role: Role,

    /// SQLite file for this node's records.
    pub data_path: PathBuf,

    /// The primary's SQLite file, read by a replica's replicator.
    pub primary_path: PathBuf,

    /// Replication settings (replica only).
    pub replication: ReplicationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8081".to_string(),
            role: Role::Primary,
            data_path: PathBuf::from("primary.db"),
            primary_path: PathBuf::from("primary.db"),
            replication: ReplicationConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Defaults for `port` and `role`, with the conventional file names
    /// `primary.db` and `replica_<port>.db`.
    pub fn for_port(port: u16, role: Role) -> Self {
        let data_path = match role {
            Role::Primary => PathBuf::from("primary.db"),
            Role::Replica => PathBuf::from(format!("replica_{}.db", port)),
        };
        Self {
            bind_address: format!("127.0.0.1:{}", port),
            role,
            data_path,
            ..Self::default()
        }
    }
}

/// Snapshot replication settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReplicationConfig {
    /// Fixed delay between sync cycles in seconds.
    pub interval_secs: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_proxy_config() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [upstreams]
            primaries = ["127.0.0.1:7001"]
            replicas = ["127.0.0.1:7002", "127.0.0.1:7003"]
            "#,
        )
        .unwrap();

        assert_eq!(config.upstreams.replicas.len(), 2);
        assert_eq!(config.cache.ttl_secs, 240);
        assert_eq!(config.cache.cleanup_interval_secs, 60);
        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
    }

    #[test]
    fn test_node_config_role() {
        let config: NodeConfig = toml::from_str(
            r#"
            role = "replica"
            data_path = "replica_8082.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.role, Role::Replica);
        assert_eq!(config.replication.interval_secs, 5);
    }

    #[test]
    fn test_for_port_file_names() {
        let replica = NodeConfig::for_port(8083, Role::Replica);
        assert_eq!(replica.data_path, PathBuf::from("replica_8083.db"));
        assert_eq!(replica.primary_path, PathBuf::from("primary.db"));
        assert_eq!(replica.bind_address, "127.0.0.1:8083");

        let primary = NodeConfig::for_port(8081, Role::Primary);
        assert_eq!(primary.data_path, PathBuf::from("primary.db"));
    }
}
