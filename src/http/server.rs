//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all proxy handler
//! - Wire up middleware (rate limiting, request ID, tracing)
//! - Dispatch requests to the routing engine and forward them upstream
//! - Serve until the shutdown signal, then drain

use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::error::ProxyError;
use crate::http::forward::Forwarder;
use crate::http::request::{decoded_path, request_id, MakeRequestUuidV4, X_REQUEST_ID};
use crate::observability::metrics;
use crate::routing::Router as ProxyRouter;
use crate::security::rate_limit::{client_id, rate_limit_middleware, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: ProxyRouter,
    pub forwarder: Forwarder,
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Build the server. Without a limiter every request is admitted.
    pub fn new(router: ProxyRouter, limiter: Option<Arc<RateLimiter>>) -> Self {
        let state = AppState {
            router,
            forwarder: Forwarder::new(),
        };
        Self {
            router: Self::build_router(state, limiter),
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Outermost first: request ID assignment, trace span, request ID
    /// propagation to the response, rate limiting, then the proxy handler.
    fn build_router(state: AppState, limiter: Option<Arc<RateLimiter>>) -> Router {
        let mut app = Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state);

        if let Some(limiter) = limiter {
            app = app.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        app.layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        client = %client_id(request),
                        request_id = %request_id(request),
                    )
                }),
            )
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
    }

    /// The router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal, draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Looks up the route, checks credentials, picks a target and forwards.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    // Routes match on the decoded path.
    let resolved = decoded_path(request.uri().path())
        .map(Cow::into_owned)
        .and_then(|path| state.router.resolve(&path, request.headers()));

    let result = match resolved {
        Ok(dispatch) => {
            tracing::debug!(
                route = %dispatch.route().path,
                target = %dispatch.target,
                "Route matched"
            );
            state
                .forwarder
                .forward(&dispatch.target, dispatch.route(), request, client_ip)
                .await
        }
        Err(e) => Err(e),
    };

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            log_failure(&e);
            e.into_response()
        }
    };

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

fn log_failure(error: &ProxyError) {
    match error {
        ProxyError::InvalidPath { .. } | ProxyError::NoRoute { .. } | ProxyError::Unauthorized => {
            tracing::debug!(error = %error, "Request rejected");
        }
        ProxyError::RateLimited { .. } => {
            tracing::warn!(error = %error, "Request rejected");
        }
        ProxyError::InvalidTarget { .. } | ProxyError::Upstream { .. } => {
            tracing::error!(error = %error, "Request failed");
        }
    }
}
