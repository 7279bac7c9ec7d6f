//! HTTP server setup for the caching proxy.
//!
//! # Responsibilities
//! - Create the Axum router with a catch-all dispatch handler
//! - Wire up middleware (timeout, body limit, request ID, tracing)
//! - Start the cache sweeper alongside the listener
//! - Drain in-flight requests on shutdown

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

use crate::cache::{CacheError, CacheSweeper, ResponseCache};
use crate::config::ProxyConfig;
use crate::http::request::with_request_tracing;
use crate::lifecycle::shutdown::ShutdownListener;
use crate::load_balancer::{BackendPool, PoolError};
use crate::proxy::Dispatcher;

/// Errors assembling the proxy.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to open response cache: {0}")]
    Cache(#[from] CacheError),

    #[error("invalid upstreams: {0}")]
    Pool(#[from] PoolError),
}

/// HTTP server for the caching proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    cache: ResponseCache,
}

impl HttpServer {
    /// Open the on-disk cache and build the server.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        let cache = ResponseCache::open(
            &config.cache.path,
            Duration::from_secs(config.cache.ttl_secs),
        )?;
        Self::with_cache(config, cache)
    }

    /// Build the server around an existing cache.
    pub fn with_cache(config: ProxyConfig, cache: ResponseCache) -> Result<Self, StartupError> {
        let pool = Arc::new(BackendPool::new(&config.upstreams)?);
        let dispatcher = Dispatcher::new(cache.clone(), pool, config.limits.max_body_bytes);
        let router = Self::build_router(&config, dispatcher);
        Ok(Self {
            router,
            config,
            cache,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, dispatcher: Dispatcher) -> Router {
        let router = Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(dispatcher)
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));
        with_request_tracing(router)
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownListener,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            primaries = ?self.config.upstreams.primaries,
            replicas = ?self.config.upstreams.replicas,
            "Proxy server starting"
        );

        let sweeper = CacheSweeper::new(
            self.cache.clone(),
            Duration::from_secs(self.config.cache.cleanup_interval_secs),
        );
        tokio::spawn(sweeper.run(shutdown.clone()));

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("Proxy server stopped");
        Ok(())
    }
}

/// Catch-all handler: every request goes through the dispatcher.
async fn proxy_handler(State(dispatcher): State<Dispatcher>, request: Request<Body>) -> Response {
    dispatcher.dispatch(request).await
}
