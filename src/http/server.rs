//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router; every request, whatever its path, goes to the
//!   admission gate
//! - Wire up middleware (request ID, tracing)
//! - Serve on a bound listener until shutdown, draining in-flight requests

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admission::AdmissionGate;
use crate::http::request::{request_id, MakeRequestUuidV4, X_REQUEST_ID};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AdmissionGate>,
}

/// HTTP front end of the proxy.
pub struct HttpServer {
    router: Router,
    gate: Arc<AdmissionGate>,
}

impl HttpServer {
    /// Create a new HTTP server dispatching to `gate`.
    pub fn new(gate: Arc<AdmissionGate>) -> Self {
        let state = AppState {
            gate: Arc::clone(&gate),
        };
        Self {
            router: Self::build_router(state),
            gate,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let peer = request
                            .extensions()
                            .get::<ConnectInfo<SocketAddr>>()
                            .map(|ConnectInfo(addr)| addr.to_string())
                            .unwrap_or_default();
                        tracing::info_span!(
                            "proxy_request",
                            request_id = %request_id(request),
                            method = %request.method(),
                            uri = %request.uri(),
                            peer = %peer,
                        )
                    }))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            )
    }

    /// Run the server, accepting connections on the given listener until a
    /// shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_concurrent = self.gate.slots().capacity(),
            rate_period_ms = self.gate.ticker().period().as_millis() as u64,
            "HTTP proxy listening"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Proxy listener stopping, draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP proxy stopped");
        Ok(())
    }

    /// Router without a listener, for embedding.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Every proxied request, regardless of method or path.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.gate.handle(request).await
}
