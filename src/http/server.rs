//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router: `/inference/**` to the proxy, everything else
//!   to the static asset directory
//! - Redirect the bare `/inference` to `/inference/`
//! - Wire up middleware (request ID, tracing)
//! - Serve on a bound listener with peer address info
//! - Drain in-flight requests on shutdown, bounded by the grace period

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode, Uri},
    middleware,
    response::IntoResponse,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::{
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::ProxyConfig;
use crate::http::request::{assign_request_id, make_request_span};
use crate::lifecycle::shutdown::{ShutdownError, SHUTDOWN_GRACE_PERIOD};
use crate::lifecycle::startup::StartupError;
use crate::proxy::{proxy_handler, ProxyState, UpstreamClient};

/// Path prefix forwarded to the upstream.
pub const INFERENCE_PREFIX: &str = "/inference/";

const INFERENCE_ROOT: &str = "/inference";

/// HTTP front door for the proxy.
///
/// Owns the router until `run` consumes it; the listener is closed when
/// `run` returns, on every exit path.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    grace_period: Duration,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        let upstream = UpstreamClient::new().map_err(StartupError::Client)?;
        let state = ProxyState::new(&config, upstream);
        let router = Self::build_router(&config, state);

        Ok(Self {
            router,
            config,
            grace_period: SHUTDOWN_GRACE_PERIOD,
        })
    }

    /// Override the shutdown grace period.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: ProxyState) -> Router {
        let assets = Router::new()
            .fallback_service(ServeDir::new(&config.static_root))
            .layer(middleware::map_request(read_asset));

        Router::new()
            .route(INFERENCE_ROOT, any(redirect_to_inference_prefix))
            .route(INFERENCE_PREFIX, any(proxy_handler))
            .route("/inference/{*path}", any(proxy_handler))
            .with_state(state)
            .fallback_service(assets)
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(make_request_span)
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(middleware::from_fn(assign_request_id))
    }

    /// Serve until `shutdown` resolves, then drain.
    ///
    /// After `shutdown` resolves no new connections are accepted; in-flight
    /// requests get the grace period to finish. Anything still running after
    /// that is dropped and reported as `ShutdownError::DeadlineExceeded`.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ShutdownError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(
                address = %addr,
                upstream = %self.config.inference_url,
                static_root = %self.config.static_root.display(),
                "HTTP server starting"
            );
        }

        let draining = Arc::new(Notify::new());
        let signal = {
            let draining = draining.clone();
            async move {
                shutdown.await;
                tracing::info!("Draining in-flight requests");
                draining.notify_one();
            }
        };

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .into_future();
        tokio::pin!(server);

        tokio::select! {
            result = &mut server => {
                result.map_err(ShutdownError::Serve)?;
                tracing::info!("HTTP server stopped");
                return Ok(());
            }
            _ = draining.notified() => {}
        }

        match tokio::time::timeout(self.grace_period, server).await {
            Ok(result) => {
                result.map_err(ShutdownError::Serve)?;
                tracing::info!("HTTP server stopped");
                Ok(())
            }
            Err(_) => Err(ShutdownError::DeadlineExceeded {
                grace: self.grace_period,
            }),
        }
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// `/inference` → 301 `/inference/`, query kept.
async fn redirect_to_inference_prefix(uri: Uri) -> impl IntoResponse {
    let location = match uri.query() {
        Some(query) => format!("{}?{}", INFERENCE_PREFIX, query),
        None => INFERENCE_PREFIX.to_string(),
    };
    let location = HeaderValue::try_from(location)
        .unwrap_or_else(|_| HeaderValue::from_static(INFERENCE_PREFIX));

    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)])
}

/// Static assets are served whatever the method; only `HEAD` keeps its
/// own semantics.
async fn read_asset(mut request: Request) -> Request {
    if request.method() != Method::HEAD {
        *request.method_mut() = Method::GET;
    }
    request
}
