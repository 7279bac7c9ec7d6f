//! Backend pool management.
//!
//! # Responsibilities
//! - Hold the primary and replica backends from configuration
//! - Pick the primary for writes
//! - Rotate reads across replicas, falling back to the primary

use std::sync::Arc;
use crate::config::UpstreamConfig;
use crate::load_balancer::{
    LoadBalancer,
    backend::Backend,
    round_robin::RoundRobin,
};

/// Errors building a [`BackendPool`].
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("at least one primary endpoint is required")]
    NoPrimary,

    #[error("invalid backend endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        endpoint: String,
        source: url::ParseError,
    },
}

/// Primary and replica backends with the read strategy.
#[derive(Debug)]
pub struct BackendPool {
    primaries: Vec<Arc<Backend>>,
    replicas: Vec<Arc<Backend>>,
    reads: Box<dyn LoadBalancer>,
}

impl BackendPool {
    /// Build the pool from configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self, PoolError> {
        let primaries = parse_all(&config.primaries)?;
        if primaries.is_empty() {
            return Err(PoolError::NoPrimary);
        }
        let replicas = parse_all(&config.replicas)?;

        if primaries.len() > 1 {
            tracing::warn!(
                configured = primaries.len(),
                "Only the first primary receives writes"
            );
        }
        tracing::info!(
            primary = %primaries[0],
            replicas = replicas.len(),
            "Backend pool ready"
        );

        Ok(Self {
            primaries,
            replicas,
            reads: Box::new(RoundRobin::new()),
        })
    }

    /// The backend every mutation goes to.
    pub fn pick_for_write(&self) -> Arc<Backend> {
        self.primaries[0].clone()
    }

    /// Next replica in rotation, or the primary if there are no replicas.
    pub fn pick_for_read(&self) -> Arc<Backend> {
        self.reads
            .next_server(&self.replicas)
            .unwrap_or_else(|| self.pick_for_write())
    }

    pub fn replicas(&self) -> &[Arc<Backend>] {
        &self.replicas
    }
}

fn parse_all(endpoints: &[String]) -> Result<Vec<Arc<Backend>>, PoolError> {
    endpoints
        .iter()
        .map(|endpoint| {
            Backend::parse(endpoint)
                .map(Arc::new)
                .map_err(|source| PoolError::InvalidEndpoint {
                    endpoint: endpoint.clone(),
                    source,
                })
        })
        .collect()
}
