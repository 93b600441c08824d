//! The admission pipeline wrapped around the forwarder.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, Request, Response};
use axum::response::IntoResponse;
use bytes::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};

use crate::admission::slots::{Slot, SlotPool};
use crate::admission::ticker::RateTicker;
use crate::forward::{ForwardError, Forwarder};
use crate::http::response;
use crate::observability::metrics;
use crate::security::{credential_token, Authenticator};

/// Terminal result of running one request through the gate.
#[derive(Debug)]
pub enum Outcome {
    /// Every connection slot was taken; nothing else ran.
    TooManyRequests,
    /// The authenticator denied the credential token.
    Unauthorized,
    /// The forwarder failed to produce a response.
    ProxyError(ForwardError),
    /// Upstream response, re-assembled for the client. Its body holds the
    /// request's slot until it is fully written or dropped.
    Forwarded(Response<Body>),
}

impl Outcome {
    /// Stable label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::TooManyRequests => "too_many_requests",
            Outcome::Unauthorized => "unauthorized",
            Outcome::ProxyError(_) => "proxy_error",
            Outcome::Forwarded(_) => "forwarded",
        }
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> axum::response::Response {
        match self {
            Outcome::TooManyRequests => response::too_many_requests(),
            Outcome::Unauthorized => response::unauthorized(),
            Outcome::ProxyError(_) => response::proxy_error(),
            Outcome::Forwarded(response) => response,
        }
    }
}

/// Concurrency gate, rate gate, authenticator and forwarder, evaluated in
/// that order for every request.
///
/// The slot pool and the ticker are built once and shared by every request
/// handled through this gate.
pub struct AdmissionGate {
    slots: SlotPool,
    ticker: RateTicker,
    authenticator: Arc<dyn Authenticator>,
    forwarder: Arc<dyn Forwarder>,
    auth_header: HeaderName,
    forward_timeout: Option<Duration>,
}

impl AdmissionGate {
    pub fn new(
        max_concurrent: usize,
        max_requests_per_second: u32,
        authenticator: Arc<dyn Authenticator>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            slots: SlotPool::new(max_concurrent),
            ticker: RateTicker::new(max_requests_per_second),
            authenticator,
            forwarder,
            auth_header: AUTHORIZATION,
            forward_timeout: None,
        }
    }

    /// Header the credential token is read from (default `Authorization`).
    pub fn with_auth_header(mut self, header: HeaderName) -> Self {
        self.auth_header = header;
        self
    }

    /// Bound each forward call. Unbounded by default.
    pub fn with_forward_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.forward_timeout = timeout;
        self
    }

    pub fn slots(&self) -> &SlotPool {
        &self.slots
    }

    pub fn ticker(&self) -> &RateTicker {
        &self.ticker
    }

    /// Run the pipeline and render the outcome as an HTTP response.
    pub async fn handle(&self, request: Request<Body>) -> axum::response::Response {
        let outcome = self.admit(request).await;
        metrics::record_outcome(outcome.label());
        outcome.into_response()
    }

    /// Run the pipeline, stopping at the first stage that produces a
    /// terminal outcome.
    pub async fn admit(&self, mut request: Request<Body>) -> Outcome {
        // Stage 1: non-blocking concurrency check.
        let Some(slot) = self.slots.try_acquire() else {
            tracing::debug!(
                capacity = self.slots.capacity(),
                "Connection slots exhausted, rejecting"
            );
            return Outcome::TooManyRequests;
        };

        // Stage 2: wait for a rate permit while holding the slot.
        let waited = self.ticker.wait().await;
        metrics::record_rate_wait(waited);
        if !waited.is_zero() {
            tracing::trace!(waited_ms = waited.as_millis() as u64, "Rate permit granted");
        }

        // Stage 3: credential check.
        let token = credential_token(request.headers(), &self.auth_header);
        if !self.authenticator.is_authorized(token) {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Credential rejected"
            );
            return Outcome::Unauthorized;
        }

        // The proxy credential is not meant for the origin.
        request.headers_mut().remove(&self.auth_header);

        // Stage 4: forward.
        let start = Instant::now();
        let method = request.method().clone();
        let uri = request.uri().clone();
        let forwarded = match self.forward_timeout {
            Some(limit) => tokio::time::timeout(limit, self.forwarder.forward(request))
                .await
                .unwrap_or(Err(ForwardError::Timeout(limit))),
            None => self.forwarder.forward(request).await,
        };

        match forwarded {
            Ok(upstream) => {
                metrics::record_forward(start, upstream.status().as_u16());
                tracing::debug!(
                    method = %method,
                    uri = %uri,
                    status = upstream.status().as_u16(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Forwarded"
                );
                Outcome::Forwarded(relay(upstream, slot))
            }
            Err(err) => {
                tracing::warn!(method = %method, uri = %uri, error = %err, "Forwarding failed");
                Outcome::ProxyError(err)
            }
        }
    }
}

/// Copy status, every header value and the body of an upstream response,
/// tying the slot to the body's lifetime.
fn relay(upstream: Response<Body>, slot: Slot) -> Response<Body> {
    let (parts, body) = upstream.into_parts();

    let mut response = Response::new(Body::new(SlotBody { inner: body, _slot: slot }));
    *response.status_mut() = parts.status;
    let headers = response.headers_mut();
    for (name, value) in parts.headers.iter() {
        headers.append(name.clone(), value.clone());
    }
    response
}

/// Response body that keeps a connection slot until it is dropped.
struct SlotBody {
    inner: Body,
    _slot: Slot,
}

impl HttpBody for SlotBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
