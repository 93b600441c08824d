//! Startup orchestration.
//!
//! Subsystems are built in dependency order and any failure is fatal: there
//! is no partially started proxy.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderName;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::admin::{run_admin, AdminState};
use crate::admission::AdmissionGate;
use crate::config::ProxyConfig;
use crate::forward::Socks5Forwarder;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::security::authenticator;

/// Reasons the proxy could not start.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("cannot resolve upstream SOCKS5 server {address}: {source}")]
    Resolve {
        address: String,
        source: std::io::Error,
    },

    #[error("invalid auth header name: {0}")]
    AuthHeader(#[from] axum::http::header::InvalidHeaderName),

    #[error("cannot bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        source: std::io::Error,
    },

    #[error("invalid {field} address `{value}`")]
    Address { field: &'static str, value: String },

    #[error("cannot install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Build the admission gate and its collaborators from configuration.
pub async fn build_gate(config: &ProxyConfig) -> Result<AdmissionGate, StartupError> {
    let forwarder = Socks5Forwarder::resolve(&config.upstream)
        .await
        .map_err(|source| StartupError::Resolve {
            address: config.upstream.socks_address.clone(),
            source,
        })?;
    tracing::info!(
        socks_addr = %forwarder.socks_addr(),
        authenticated = config.upstream.credentials().is_some(),
        "Upstream SOCKS5 server resolved"
    );

    let auth_header = HeaderName::from_bytes(config.auth.header.as_bytes())?;

    Ok(AdmissionGate::new(
        config.limits.max_concurrent_connections,
        config.limits.max_requests_per_second,
        authenticator::from_config(&config.auth),
        Arc::new(forwarder),
    )
    .with_auth_header(auth_header)
    .with_forward_timeout(config.timeouts.forward_secs.map(Duration::from_secs)))
}

async fn bind(address: SocketAddr) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind { address, source })
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|_| StartupError::Address {
        field,
        value: value.to_string(),
    })
}

/// Start every subsystem and serve until SIGINT/SIGTERM.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr = parse_addr("metrics", &config.observability.metrics_address)?;
        metrics::init_metrics(addr)?;
    }

    let gate = Arc::new(build_gate(&config).await?);
    let shutdown = Shutdown::new();

    let admin = if config.admin.enabled {
        let addr = parse_addr("admin", &config.admin.bind_address)?;
        let listener = bind(addr).await?;
        let state = AdminState {
            gate: Arc::clone(&gate),
            api_key: Arc::from(config.admin.api_key.as_str()),
            max_requests_per_second: config.limits.max_requests_per_second,
        };
        let admin_shutdown = shutdown.subscribe();
        Some(tokio::spawn(async move {
            if let Err(err) = run_admin(listener, state, admin_shutdown).await {
                tracing::error!(error = %err, "Admin endpoint failed");
            }
        }))
    } else {
        None
    };

    let listener = bind(config.listen_addr()).await?;
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown.clone());

    HttpServer::new(gate).run(listener, server_shutdown).await?;

    shutdown.trigger();
    if let Some(admin) = admin {
        let _ = admin.await;
    }
    Ok(())
}
