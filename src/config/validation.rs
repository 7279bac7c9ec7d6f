//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, addresses parse)
//! - Check endpoint strings before the pool is built
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function over the parsed config

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{NodeConfig, ObservabilityConfig, ProxyConfig};
use crate::load_balancer::Backend;
use crate::store::Role;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Something that can be checked after parsing.
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<ValidationError>>;
}

impl Validate for ProxyConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        check_socket_addr(&mut errors, "listener.bind_address", &self.listener.bind_address);

        if self.upstreams.primaries.is_empty() {
            errors.push(ValidationError::new("upstreams.primaries", "at least one primary is required"));
        }
        for (i, endpoint) in self.upstreams.primaries.iter().enumerate() {
            check_endpoint(&mut errors, &format!("upstreams.primaries[{}]", i), endpoint);
        }
        for (i, endpoint) in self.upstreams.replicas.iter().enumerate() {
            check_endpoint(&mut errors, &format!("upstreams.replicas[{}]", i), endpoint);
        }

        if self.cache.ttl_secs == 0 {
            errors.push(ValidationError::new("cache.ttl_secs", "must be greater than 0"));
        }
        if self.cache.cleanup_interval_secs == 0 {
            errors.push(ValidationError::new("cache.cleanup_interval_secs", "must be greater than 0"));
        }
        if self.timeouts.request_secs == 0 {
            errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
        }
        if self.limits.max_body_bytes == 0 {
            errors.push(ValidationError::new("limits.max_body_bytes", "must be greater than 0"));
        }
        check_observability(&mut errors, &self.observability);

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Validate for NodeConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        check_socket_addr(&mut errors, "bind_address", &self.bind_address);

        if self.data_path.as_os_str().is_empty() {
            errors.push(ValidationError::new("data_path", "must not be empty"));
        }
        if self.role == Role::Replica {
            if self.primary_path.as_os_str().is_empty() {
                errors.push(ValidationError::new("primary_path", "replicas need the primary's data file"));
            } else if self.primary_path == self.data_path {
                errors.push(ValidationError::new("data_path", "a replica cannot share the primary's data file"));
            }
            if self.replication.interval_secs == 0 {
                errors.push(ValidationError::new("replication.interval_secs", "must be greater than 0"));
            }
        }
        check_observability(&mut errors, &self.observability);

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("'{}' is not a socket address", value)));
    }
}

fn check_endpoint(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if let Err(e) = Backend::parse(value) {
        errors.push(ValidationError::new(field, format!("'{}': {}", value, e)));
    }
}

fn check_observability(errors: &mut Vec<ValidationError>, config: &ObservabilityConfig) {
    if config.metrics_enabled {
        check_socket_addr(errors, "observability.metrics_address", &config.metrics_address);
    }
}
