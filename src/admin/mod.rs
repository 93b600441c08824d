//! Admin endpoint: read-only view of the admission state, on its own
//! listener, behind a Bearer API key.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use self::auth::admin_auth_middleware;
use self::handlers::get_status;
use crate::admission::AdmissionGate;

#[derive(Clone)]
pub struct AdminState {
    pub gate: Arc<AdmissionGate>,
    pub api_key: Arc<str>,
    pub max_requests_per_second: u32,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

/// Serve the admin router until shutdown.
pub async fn run_admin(
    listener: TcpListener,
    state: AdminState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    tracing::info!(address = %listener.local_addr()?, "Admin endpoint listening");
    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::{ForwardError, Forwarder};
    use crate::security::AllowAll;
    use axum::body::Body;
    use axum::http::{header::AUTHORIZATION, Request, Response, StatusCode};
    use futures_util::future::BoxFuture;
    use tower::ServiceExt;

    struct NeverCalled;

    impl Forwarder for NeverCalled {
        fn forward(&self, _: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, ForwardError>> {
            Box::pin(async { Err(ForwardError::MissingHost) })
        }
    }

    fn state() -> AdminState {
        AdminState {
            gate: Arc::new(AdmissionGate::new(4, 10, Arc::new(AllowAll), Arc::new(NeverCalled))),
            api_key: Arc::from("secret"),
            max_requests_per_second: 10,
        }
    }

    #[tokio::test]
    async fn status_requires_key() {
        let response = setup_admin_router(state())
            .oneshot(Request::get("/admin/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = setup_admin_router(state())
            .oneshot(
                Request::get("/admin/status")
                    .header(AUTHORIZATION, "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn status_reports_slot_occupancy() {
        let state = state();
        let _held = state.gate.slots().try_acquire().unwrap();

        let response = setup_admin_router(state)
            .oneshot(
                Request::get("/admin/status")
                    .header(AUTHORIZATION, "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["max_concurrent"], 4);
        assert_eq!(json["slots_in_use"], 1);
        assert_eq!(json["max_requests_per_second"], 10);
        assert_eq!(json["rate_period_ms"], 100);
    }
}
