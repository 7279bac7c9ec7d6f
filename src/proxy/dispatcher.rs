//! Request dispatch: cache lookup, backend choice, invalidation, forwarding.

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::ResponseCache;
use crate::http::request::{request_id_of, X_REQUEST_ID};
use crate::http::response::{json_body, ApiError};
use crate::load_balancer::{Backend, BackendPool};
use crate::observability::metrics;
use crate::proxy::invalidation::{cache_key, invalidation_key};

/// How a method is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodClass {
    /// GET: cacheable, served by replicas.
    Read,
    /// PUT, POST, DELETE: sent to the primary.
    Write,
}

impl MethodClass {
    pub fn of(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(MethodClass::Read),
            Method::PUT | Method::POST | Method::DELETE => Some(MethodClass::Write),
            _ => None,
        }
    }
}

/// Errors talking to a backend.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("could not build request for {backend}: {source}")]
    Request {
        backend: String,
        source: axum::http::Error,
    },

    #[error("backend {backend} unreachable: {source}")]
    Unreachable {
        backend: String,
        source: hyper_util::client::legacy::Error,
    },

    #[error("failed reading response from {backend}: {source}")]
    ResponseBody {
        backend: String,
        source: axum::Error,
    },
}

/// A backend's answer, fully buffered.
struct Relayed {
    status: StatusCode,
    content_type: Option<header::HeaderValue>,
    body: Bytes,
}

/// Shared proxy state: the cache, the backend pool and the outbound client.
#[derive(Clone)]
pub struct Dispatcher {
    cache: ResponseCache,
    pool: Arc<BackendPool>,
    client: Client<HttpConnector, Body>,
    max_body_bytes: usize,
}

impl Dispatcher {
    pub fn new(cache: ResponseCache, pool: Arc<BackendPool>, max_body_bytes: usize) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            cache,
            pool,
            client,
            max_body_bytes,
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Handle one inbound request end to end.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let request_id = request_id_of(request.headers());
        let method = request.method().clone();
        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        let Some(class) = MethodClass::of(&method) else {
            tracing::warn!(request_id = %request_id, method = %method, "Unsupported method");
            metrics::record_request(method.as_str(), 405, "none", start);
            return ApiError::MethodNotAllowed(format!("Method {} not supported", method))
                .into_response();
        };

        let key = cache_key(&method, &path_and_query);

        if class == MethodClass::Read {
            match self.cache.get(&key).await {
                Ok(Some(content)) => {
                    tracing::info!(request_id = %request_id, key = %key, "Cache hit");
                    metrics::record_request(method.as_str(), 200, "cache", start);
                    return json_body(StatusCode::OK, content);
                }
                Ok(None) => tracing::debug!(request_id = %request_id, key = %key, "Cache miss"),
                Err(e) => {
                    tracing::warn!(request_id = %request_id, key = %key, error = %e, "Cache lookup failed, treating as miss")
                }
            }
        }

        let backend = match class {
            MethodClass::Read => self.pool.pick_for_read(),
            MethodClass::Write => self.pool.pick_for_write(),
        };

        let (parts, body) = request.into_parts();
        let body = match axum::body::to_bytes(body, self.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Request body rejected");
                metrics::record_request(method.as_str(), 413, "none", start);
                return ApiError::PayloadTooLarge("Request body too large".to_string())
                    .into_response();
            }
        };

        if class == MethodClass::Write {
            self.invalidate(&request_id, &method, parts.uri.path(), &body).await;
        }

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %path_and_query,
            backend = %backend,
            "Forwarding request"
        );

        let backend_label = backend.authority();
        match self
            .forward(&backend, &method, &path_and_query, &parts.headers, body)
            .await
        {
            Ok(relayed) => {
                metrics::record_request(method.as_str(), relayed.status.as_u16(), &backend_label, start);

                if class == MethodClass::Read && relayed.status.is_success() {
                    self.store(&request_id, &key, &relayed.body).await;
                }

                let mut response = (relayed.status, Body::from(relayed.body)).into_response();
                let content_type = relayed
                    .content_type
                    .unwrap_or(header::HeaderValue::from_static("application/json"));
                response.headers_mut().insert(header::CONTENT_TYPE, content_type);
                response
            }
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "Upstream error");
                metrics::record_request(method.as_str(), 502, &backend_label, start);
                ApiError::BadGateway(format!("Upstream request failed: {}", e)).into_response()
            }
        }
    }

    /// Drop the cached read a write makes stale. Failures are logged only.
    async fn invalidate(&self, request_id: &str, method: &Method, path: &str, body: &[u8]) {
        let key = match invalidation_key(method, path, body) {
            Ok(Some(key)) => key,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Could not derive invalidation key");
                metrics::record_cache_invalidation(false);
                return;
            }
        };

        match self.cache.delete(&key).await {
            Ok(()) => {
                tracing::info!(request_id = %request_id, key = %key, "Cache invalidated");
                metrics::record_cache_invalidation(true);
            }
            Err(e) => {
                tracing::warn!(request_id = %request_id, key = %key, error = %e, "Cache invalidation failed");
                metrics::record_cache_invalidation(false);
            }
        }
    }

    async fn store(&self, request_id: &str, key: &str, body: &Bytes) {
        let content = match std::str::from_utf8(body) {
            Ok(content) => content,
            Err(_) => {
                tracing::debug!(request_id = %request_id, key = %key, "Response is not UTF-8, not caching");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, content).await {
            tracing::warn!(request_id = %request_id, key = %key, error = %e, "Cache store failed");
        }
    }

    async fn forward(
        &self,
        backend: &Backend,
        method: &Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Relayed, ForwardError> {
        let mut builder = Request::builder()
            .method(method.clone())
            .uri(backend.url_for(path_and_query));
        for name in [header::CONTENT_TYPE.as_str(), X_REQUEST_ID] {
            if let Some(value) = headers.get(name) {
                builder = builder.header(name, value.clone());
            }
        }
        let outbound = builder
            .body(Body::from(body))
            .map_err(|source| ForwardError::Request {
                backend: backend.to_string(),
                source,
            })?;

        let response: hyper::Response<hyper::body::Incoming> = self
            .client
            .request(outbound)
            .await
            .map_err(|source| ForwardError::Unreachable {
                backend: backend.to_string(),
                source,
            })?;

        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = axum::body::to_bytes(Body::new(response.into_body()), usize::MAX)
            .await
            .map_err(|source| ForwardError::ResponseBody {
                backend: backend.to_string(),
                source,
            })?;

        Ok(Relayed {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, DEFAULT_TTL};
    use crate::config::UpstreamConfig;

    fn dispatcher(primaries: Vec<String>) -> Dispatcher {
        let cache = ResponseCache::in_memory(DEFAULT_TTL, Arc::new(ManualClock::new(0))).unwrap();
        let pool = BackendPool::new(&UpstreamConfig {
            primaries,
            replicas: vec![],
        })
        .unwrap();
        Dispatcher::new(cache, Arc::new(pool), 1024)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_method_classes() {
        assert_eq!(MethodClass::of(&Method::GET), Some(MethodClass::Read));
        assert_eq!(MethodClass::of(&Method::PUT), Some(MethodClass::Write));
        assert_eq!(MethodClass::of(&Method::POST), Some(MethodClass::Write));
        assert_eq!(MethodClass::of(&Method::DELETE), Some(MethodClass::Write));
        assert_eq!(MethodClass::of(&Method::PATCH), None);
        assert_eq!(MethodClass::of(&Method::HEAD), None);
    }

    #[tokio::test]
    async fn test_unsupported_method_is_405() {
        let d = dispatcher(vec!["127.0.0.1:1".into()]);
        let request = Request::builder()
            .method(Method::PATCH)
            .uri("/employee/1")
            .body(Body::empty())
            .unwrap();
        let response = d.dispatch(request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_cache_hit_skips_backend() {
        // Port 1 refuses connections, so only a hit can answer 200.
        let d = dispatcher(vec!["127.0.0.1:1".into()]);
        d.cache().set("GET:/employee/1", r#"{"id":1}"#).await.unwrap();

        let request = Request::builder().uri("/employee/1").body(Body::empty()).unwrap();
        let response = d.dispatch(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], 1);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_502() {
        let d = dispatcher(vec!["127.0.0.1:1".into()]);
        let request = Request::builder().uri("/employees").body(Body::empty()).unwrap();
        let response = d.dispatch(request).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_write_invalidates_before_forwarding() {
        let d = dispatcher(vec!["127.0.0.1:1".into()]);
        d.cache().set("GET:/employee/3", "{}").await.unwrap();

        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/employee/3")
            .body(Body::empty())
            .unwrap();
        // Forwarding fails, the invalidation still happened.
        let response = d.dispatch(request).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(d.cache().get("GET:/employee/3").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_oversized_body_is_413() {
        let d = dispatcher(vec!["127.0.0.1:1".into()]);
        let request = Request::builder()
            .method(Method::PUT)
            .uri("/employee")
            .body(Body::from(vec![b'x'; 4096]))
            .unwrap();
        let response = d.dispatch(request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
