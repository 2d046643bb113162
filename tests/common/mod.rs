//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request};
use axum::response::IntoResponse;
use axum::{Json, Router};
use fair_use_proxy::lifecycle::ShutdownError;
use fair_use_proxy::{HttpServer, ProxyConfig, Shutdown};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const ACCESS_TOKEN: &str = "ghp_privileged";
pub const FAIR_USE_TOKEN: &str = "abc123";

/// A mock upstream that answers every request with a JSON description of
/// what it received.
pub struct EchoBackend {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl EchoBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub async fn start_echo_backend() -> EchoBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    let app = Router::new().fallback(move |request: Request<Body>| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            echo(request).await
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    EchoBackend { addr, hits }
}

async fn echo(request: Request<Body>) -> impl IntoResponse {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

    let description = json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "headers": headers_as_json(&parts.headers),
        "body": String::from_utf8_lossy(&body),
    });

    ([("x-upstream", "echo")], Json(description))
}

fn headers_as_json(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for name in headers.keys() {
        let values: Vec<Value> = headers
            .get_all(name)
            .iter()
            .map(|v| Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        map.insert(name.as_str().to_string(), Value::Array(values));
    }
    Value::Object(map)
}

/// Start a mock upstream that waits `delay` before answering `done`.
#[allow(dead_code)]
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "done"
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    addr
}

/// An address nothing listens on.
#[allow(dead_code)]
pub fn closed_upstream() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn test_config(upstream: &str, static_root: &Path) -> ProxyConfig {
    let env = std::collections::HashMap::from([
        ("GITHUB_MODELS_PAT", ACCESS_TOKEN.to_string()),
        ("GITHUB_MODELS_URL", upstream.to_string()),
        ("FAIR_USE_TOKEN", FAIR_USE_TOKEN.to_string()),
        ("PORT", "8080".to_string()),
        ("STATIC_ROOT", static_root.display().to_string()),
    ]);
    ProxyConfig::from_lookup(|name| env.get(name).cloned()).unwrap()
}

/// A running proxy on an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ShutdownError>>,
    static_dir: tempfile::TempDir,
}

#[allow(dead_code)]
impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn static_root(&self) -> &Path {
        self.static_dir.path()
    }
}

pub async fn start_proxy(upstream: &str, grace_period: Option<Duration>) -> TestProxy {
    let static_root = tempfile::tempdir().unwrap();
    let config = test_config(upstream, static_root.path());

    let mut server = HttpServer::new(config).unwrap();
    if let Some(grace) = grace_period {
        server = server.with_grace_period(grace);
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let stop = shutdown.wait();

    let handle = tokio::spawn(async move { server.run(listener, stop).await });

    TestProxy {
        addr,
        shutdown,
        handle,
        static_dir: static_root,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
}
