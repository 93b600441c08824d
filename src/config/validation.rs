//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! requirements. Every problem is reported, not just the first one.

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.port must not be 0")]
    ZeroPort,

    #[error("upstream.socks_address is required")]
    MissingSocksAddress,

    #[error("upstream.socks_address `{0}` is not host:port")]
    InvalidSocksAddress(String),

    #[error("limits.max_concurrent_connections must be at least 1")]
    ZeroConcurrency,

    #[error("limits.max_requests_per_second must be at least 1")]
    ZeroRate,

    #[error("auth.header `{0}` is not a valid header name")]
    InvalidAuthHeader(String),

    #[error("timeouts.forward_secs must be at least 1 when set")]
    ZeroForwardTimeout,

    #[error("{field} `{value}` is not a socket address")]
    InvalidSocketAddress { field: &'static str, value: String },

    #[error("admin.api_key must be set when the admin endpoint is enabled")]
    MissingAdminKey,
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }

    let socks = config.upstream.socks_address.trim();
    if socks.is_empty() {
        errors.push(ValidationError::MissingSocksAddress);
    } else if !is_host_port(socks) {
        errors.push(ValidationError::InvalidSocksAddress(socks.to_string()));
    }

    if config.limits.max_concurrent_connections == 0 {
        errors.push(ValidationError::ZeroConcurrency);
    }
    if config.limits.max_requests_per_second == 0 {
        errors.push(ValidationError::ZeroRate);
    }

    if HeaderName::from_bytes(config.auth.header.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidAuthHeader(config.auth.header.clone()));
    }

    if config.timeouts.forward_secs == Some(0) {
        errors.push(ValidationError::ZeroForwardTimeout);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidSocketAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.admin.enabled {
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidSocketAddress {
                field: "admin.bind_address",
                value: config.admin.bind_address.clone(),
            });
        }
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::MissingAdminKey);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `host:port` with a non-empty host and a numeric, non-zero port.
fn is_host_port(value: &str) -> bool {
    match value.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && matches!(port.parse::<u16>(), Ok(p) if p != 0),
        None => false,
    }
}
