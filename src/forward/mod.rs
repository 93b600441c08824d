//! Upstream forwarding.
//!
//! # Data Flow
//! ```text
//! Admitted request (absolute-form URI)
//!     → socks.rs (SOCKS5 CONNECT to target host:port)
//!     → HTTP/1.1 handshake over the tunnel
//!     → request sent in origin-form, response head returned
//!     → body streamed back by the HTTP server
//! ```
//!
//! The admission gate only depends on the [`Forwarder`] trait, so tests and
//! embedders can substitute any transport.

pub mod socks;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use futures_util::future::BoxFuture;
use thiserror::Error;

pub use socks::Socks5Forwarder;

/// Transport failures while forwarding a request upstream.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("request URI has no host")]
    MissingHost,

    #[error("method {0} is not supported by this proxy")]
    UnsupportedMethod(Method),

    #[error("scheme {0} is not supported by this proxy")]
    UnsupportedScheme(String),

    #[error("invalid upstream request: {0}")]
    InvalidRequest(#[from] axum::http::Error),

    #[error("SOCKS5 connection failed: {0}")]
    Socks(#[from] tokio_socks::Error),

    #[error("upstream HTTP exchange failed: {0}")]
    Http(#[from] hyper::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),
}

/// Sends one request upstream and returns the upstream response.
pub trait Forwarder: Send + Sync {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, ForwardError>>;
}
