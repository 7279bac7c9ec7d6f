//! HTTP server for one storage node.
//!
//! # Responsibilities
//! - Route the employee API onto the node's record store
//! - Reject methods the node's role does not serve before any handler runs
//! - Drain in-flight requests on shutdown

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::http::request::with_request_tracing;
use crate::http::response::ApiError;
use crate::lifecycle::shutdown::ShutdownListener;
use crate::node::handlers;
use crate::store::{RecordStore, Role, StoreError};

/// State shared by node handlers.
#[derive(Debug, Clone)]
pub struct NodeState {
    pub store: Arc<RecordStore>,
    pub port: u16,
}

/// A primary or replica node.
pub struct NodeServer {
    router: Router,
    role: Role,
}

impl NodeServer {
    /// Build the node for `store`; `port` is reported by `/health`.
    pub fn new(store: Arc<RecordStore>, port: u16) -> Self {
        let role = store.role();
        let state = NodeState { store, port };
        Self {
            router: Self::build_router(state),
            role,
        }
    }

    fn build_router(state: NodeState) -> Router {
        let router = Router::new()
            .route(
                "/employee/{id}",
                get(handlers::get_employee)
                    .delete(handlers::delete_employee)
                    .fallback(handlers::not_found),
            )
            .route(
                "/employee",
                put(handlers::create_employee)
                    .post(handlers::update_employee)
                    .fallback(handlers::not_found),
            )
            .route(
                "/employees",
                get(handlers::list_employees).fallback(handlers::not_found),
            )
            .route("/health", get(handlers::health).fallback(handlers::not_found))
            .fallback(handlers::not_found)
            .layer(middleware::from_fn_with_state(state.clone(), role_filter))
            .with_state(state);
        with_request_tracing(router)
    }

    /// The router, for driving the node without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownListener,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, role = %self.role, "Node server starting");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!(role = %self.role, "Node server stopped");
        Ok(())
    }
}

/// Whether a node of `role` refuses `method` outright.
pub fn rejects(role: Role, method: &Method) -> bool {
    match role {
        Role::Primary => *method == Method::GET,
        Role::Replica => matches!(*method, Method::PUT | Method::POST | Method::DELETE),
    }
}

/// Answer 403 for methods the role does not serve, on every path.
async fn role_filter(State(state): State<NodeState>, request: Request, next: Next) -> Response {
    let role = state.store.role();
    if rejects(role, request.method()) {
        let operation = match role {
            Role::Primary => "read operations",
            Role::Replica => "write operations",
        };
        tracing::warn!(
            role = %role,
            method = %request.method(),
            path = %request.uri().path(),
            "Rejected by role filter"
        );
        return ApiError::from(StoreError::role_violation(role, operation)).into_response();
    }
    next.run(request).await
}
