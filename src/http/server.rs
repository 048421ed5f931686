//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch fallback handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind server to listener and drain on shutdown
//! - Split requests into API and page dispatches
//! - Observability (metrics, correlation IDs)

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::http::request::RequestInfo;
use crate::lifecycle::shutdown;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub api_prefix: Arc<str>,
}

impl AppState {
    /// Whether a path belongs to the API namespace.
    pub fn is_api_path(&self, path: &str) -> bool {
        let prefix = self.api_prefix.trim_end_matches('/');
        path == prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// HTTP front end for a dispatcher.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        let state = AppState {
            dispatcher,
            api_prefix: Arc::from(config.dispatch.api_prefix.as_str()),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        let layers = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(layers)
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown receiver fires, then drain
    /// in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Dispatch every request to the API or page resolver.
///
/// The request's cancellation token fires when this future is dropped,
/// which happens when the client disconnects or the timeout layer gives up.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, _body) = request.into_parts();
    let info = RequestInfo::from_parts(&parts);
    let request_id = info.request_id().to_string();

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let (kind, response) = if state.is_api_path(&info.path) {
        ("api", respond(state.dispatcher.dispatch_api(info, cancel).await))
    } else if info.method == Method::GET || info.method == Method::HEAD {
        ("page", respond(state.dispatcher.dispatch_page(info, cancel).await))
    } else {
        let response = (StatusCode::METHOD_NOT_ALLOWED, "Pages only accept GET and HEAD")
            .into_response();
        ("page", response)
    };

    let status = response.status();
    if status.is_server_error() {
        tracing::warn!(request_id = %request_id, status = status.as_u16(), "Request failed");
    } else {
        tracing::debug!(request_id = %request_id, status = status.as_u16(), "Request completed");
    }
    metrics::record_dispatch(kind, status.as_u16(), start);
    response
}

fn respond<T: IntoResponse>(result: Result<T, DispatchError>) -> Response {
    match result {
        Ok(value) => value.into_response(),
        Err(err) => err.into_response(),
    }
}
