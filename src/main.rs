//! Warehouse caching proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                CACHING PROXY                  │
//!   Client Request    │  ┌────────┐   ┌────────────┐   ┌──────────┐  │
//!   ──────────────────┼─▶│  http  │──▶│ dispatcher │──▶│  cache   │  │
//!                     │  │ server │   │            │   │ (SQLite) │  │
//!                     │  └────────┘   └─────┬──────┘   └──────────┘  │
//!                     │                     │ miss / write           │
//!                     │                     ▼                        │
//!                     │             ┌──────────────┐                 │
//!                     │             │load_balancer │                 │
//!                     │             └──┬────────┬──┘                 │
//!                     └────────────────┼────────┼────────────────────┘
//!                            writes    ▼        ▼   reads (round robin)
//!                               ┌─────────┐  ┌──────────┐
//!                               │ primary │  │ replicas │◀── replicator
//!                               └─────────┘  └──────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use warehouse_proxy::config::{load_or_default, ConfigError, ProxyConfig, Validate};
use warehouse_proxy::http::HttpServer;
use warehouse_proxy::lifecycle::{spawn_signal_listener, Shutdown};
use warehouse_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "warehouse-proxy")]
#[command(about = "Caching reverse proxy in front of the warehouse nodes", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:8080.
    #[arg(long)]
    bind: Option<String>,

    /// Primary endpoint (repeatable).
    #[arg(long = "primary")]
    primaries: Vec<String>,

    /// Replica endpoint (repeatable).
    #[arg(long = "replica")]
    replicas: Vec<String>,

    /// Cache database file.
    #[arg(long)]
    cache_path: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config: ProxyConfig = load_or_default(self.config.as_deref())?;
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if !self.primaries.is_empty() {
            config.upstreams.primaries = self.primaries;
        }
        if !self.replicas.is_empty() {
            config.upstreams.replicas = self.replicas;
        }
        if let Some(path) = self.cache_path {
            config.cache.path = path;
        }
        config.validate().map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("warehouse-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        cache_path = %config.cache.path.display(),
        ttl_secs = config.cache.ttl_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
