//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use warehouse_proxy::cache::{ResponseCache, SystemClock, DEFAULT_TTL};
use warehouse_proxy::config::{ProxyConfig, UpstreamConfig};
use warehouse_proxy::http::HttpServer;
use warehouse_proxy::lifecycle::Shutdown;
use warehouse_proxy::node::NodeServer;
use warehouse_proxy::store::RecordStore;

/// A running mock backend and what it has seen.
pub struct MockBackend {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }

    /// Requests served so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// `"METHOD /path?query"` lines, oldest first.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a mock backend answering every request with 200 `{"ok":true}`.
pub async fn start_mock_backend() -> MockBackend {
    start_programmable_backend(|_| async { (200, r#"{"ok":true}"#.to_string()) }).await
}

/// Start a programmable mock backend. `f` receives the request line
/// (`"GET /employees?offset=0"`) and returns status and JSON body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let (h, r) = (hits.clone(), requests.clone());
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let (f, hits, requests) = (f.clone(), h.clone(), r.clone());
                    tokio::spawn(async move {
                        let Some(line) = read_request(&mut socket).await else { return };
                        hits.fetch_add(1, Ordering::SeqCst);
                        requests.lock().unwrap().push(line.clone());

                        let (status, body) = f(line).await;
                        let reason = axum::http::StatusCode::from_u16(status)
                            .ok()
                            .and_then(|s| s.canonical_reason())
                            .unwrap_or("OK");
                        let response = format!(
                            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            reason,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockBackend { addr, hits, requests }
}

/// Read one request head and body; return `"METHOD target"`.
async fn read_request(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|l| {
            let (name, value) = l.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    while buf.len() < head_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let mut parts = head.lines().next()?.split_whitespace();
    Some(format!("{} {}", parts.next()?, parts.next()?))
}

/// An address nothing listens on.
pub async fn dead_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

/// Start a node for `store` on an ephemeral port.
pub async fn start_node(store: Arc<RecordStore>, shutdown: &Shutdown) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = NodeServer::new(store, addr.port());
    tokio::spawn(server.run(listener, shutdown.subscribe()));
    addr
}

/// Start a proxy over the given upstreams with an in-memory cache.
pub async fn start_proxy(
    primaries: Vec<String>,
    replicas: Vec<String>,
    shutdown: &Shutdown,
) -> (SocketAddr, ResponseCache) {
    let mut config = ProxyConfig::default();
    config.upstreams = UpstreamConfig { primaries, replicas };

    let cache = ResponseCache::in_memory(DEFAULT_TTL, Arc::new(SystemClock)).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::with_cache(config, cache.clone()).unwrap();
    tokio::spawn(server.run(listener, shutdown.subscribe()));
    (addr, cache)
}

/// Poll `f` until it returns true or `timeout` passes.
pub async fn eventually<F, Fut>(timeout: Duration, mut f: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if f().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}
