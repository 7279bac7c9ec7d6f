//! Warehouse storage node.
//!
//! `warehouse-node <port> <primary|replica>` serves the employee API on
//! `127.0.0.1:<port>`. A primary keeps `primary.db`; a replica keeps
//! `replica_<port>.db` and refreshes it from the primary's file.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use warehouse_proxy::config::{load_config, ConfigError, NodeConfig, Validate};
use warehouse_proxy::lifecycle::{spawn_signal_listener, Shutdown};
use warehouse_proxy::node::NodeServer;
use warehouse_proxy::observability::{logging, metrics};
use warehouse_proxy::replication::{PrimaryFileSource, Replicator};
use warehouse_proxy::store::{RecordStore, Role};

#[derive(Parser)]
#[command(name = "warehouse-node")]
#[command(about = "Primary or replica storage node", long_about = None)]
struct Cli {
    /// Port to listen on.
    port: u16,

    /// Node role.
    #[arg(value_enum)]
    role: Role,

    /// TOML configuration file; port and role above still apply.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// This node's SQLite file.
    #[arg(long)]
    data_path: Option<PathBuf>,

    /// The primary's SQLite file (replica only).
    #[arg(long)]
    primary_path: Option<PathBuf>,

    /// Seconds between replication cycles (replica only).
    #[arg(long)]
    interval_secs: Option<u64>,
}

impl Cli {
    fn into_config(self) -> Result<NodeConfig, ConfigError> {
        let mut config = match self.config.as_deref() {
            Some(path) => {
                let mut config: NodeConfig = load_config(path)?;
                let host = config
                    .bind_address
                    .parse::<SocketAddr>()
                    .map(|addr| addr.ip().to_string())
                    .unwrap_or_else(|_| "127.0.0.1".to_string());
                config.bind_address = format!("{}:{}", host, self.port);
                config.role = self.role;
                config
            }
            None => NodeConfig::for_port(self.port, self.role),
        };
        if let Some(path) = self.data_path {
            config.data_path = path;
        }
        if let Some(path) = self.primary_path {
            config.primary_path = path;
        }
        if let Some(secs) = self.interval_secs {
            config.replication.interval_secs = secs;
        }
        config.validate().map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let port = cli.port;
    let config = cli.into_config()?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(
        role = %config.role,
        bind_address = %config.bind_address,
        data_path = %config.data_path.display(),
        "warehouse-node v{} starting",
        env!("CARGO_PKG_VERSION")
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

    let store = Arc::new(RecordStore::open(&config.data_path, config.role)?);

    let listener = TcpListener::bind(&config.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    if config.role == Role::Replica {
        let source = PrimaryFileSource::new(config.primary_path.clone());
        let replicator = Arc::new(Replicator::new(
            store.clone(),
            source,
            Duration::from_secs(config.replication.interval_secs),
        )?);
        tokio::spawn(replicator.run(shutdown.subscribe()));
    }

    NodeServer::new(store, port)
        .run(listener, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
