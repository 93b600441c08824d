//! SOCKS5-tunneled HTTP/1.1 forwarding.

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::header::{HeaderValue, HOST};
use axum::http::uri::PathAndQuery;
use axum::http::{Method, Request, Response, Uri, Version};
use futures_util::future::BoxFuture;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio_socks::tcp::Socks5Stream;

use crate::config::UpstreamConfig;
use crate::forward::{ForwardError, Forwarder};

/// Forwards plain-HTTP proxy requests through one upstream SOCKS5 server.
///
/// Each request gets its own SOCKS5 tunnel and HTTP/1.1 connection; the
/// connection closes once the response body has been consumed.
#[derive(Debug, Clone)]
pub struct Socks5Forwarder {
    socks_addr: SocketAddr,
    credentials: Option<(String, String)>,
}

impl Socks5Forwarder {
    pub fn new(socks_addr: SocketAddr, credentials: Option<(String, String)>) -> Self {
        Self {
            socks_addr,
            credentials,
        }
    }

    /// Resolve the configured SOCKS5 address once, at startup.
    pub async fn resolve(config: &UpstreamConfig) -> std::io::Result<Self> {
        let socks_addr = tokio::net::lookup_host(config.socks_address.as_str())
            .await?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no addresses found for {}", config.socks_address),
                )
            })?;
        Ok(Self::new(socks_addr, config.credentials()))
    }

    pub fn socks_addr(&self) -> SocketAddr {
        self.socks_addr
    }

    async fn dial(&self, host: &str, port: u16) -> Result<Socks5Stream<TcpStream>, ForwardError> {
        let stream = match &self.credentials {
            Some((user, password)) => {
                Socks5Stream::connect_with_password(self.socks_addr, (host, port), user, password)
                    .await?
            }
            None => Socks5Stream::connect(self.socks_addr, (host, port)).await?,
        };
        Ok(stream)
    }

    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        if request.method() == Method::CONNECT {
            return Err(ForwardError::UnsupportedMethod(Method::CONNECT));
        }
        let uri = request.uri();
        if let Some(scheme) = uri.scheme_str() {
            if scheme != "http" {
                return Err(ForwardError::UnsupportedScheme(scheme.to_string()));
            }
        }
        let authority = uri.authority().ok_or(ForwardError::MissingHost)?.clone();
        let host = authority.host().trim_start_matches('[').trim_end_matches(']');
        let port = authority.port_u16().unwrap_or(80);

        let stream = self.dial(host, port).await?;
        tracing::debug!(target_host = %host, target_port = port, "SOCKS5 tunnel established");

        let (mut sender, conn) =
            hyper::client::conn::http1::handshake::<_, Body>(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(err) = conn.await {
                tracing::debug!(error = %err, "Upstream connection ended with error");
            }
        });

        let request = to_origin_form(request, authority.as_str())?;
        let response = sender.send_request(request).await?;
        Ok(response.map(Body::new))
    }
}

impl Forwarder for Socks5Forwarder {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, ForwardError>> {
        Box::pin(self.send(request))
    }
}

/// Rewrite an absolute-form proxy request into the origin-form an origin
/// server expects, keeping every header and the body.
fn to_origin_form(request: Request<Body>, authority: &str) -> Result<Request<Body>, ForwardError> {
    let (mut parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));
    parts.uri = Uri::builder().path_and_query(path_and_query).build()?;
    parts.version = Version::HTTP_11;

    if !parts.headers.contains_key(HOST) {
        let value = HeaderValue::from_str(authority).map_err(axum::http::Error::from)?;
        parts.headers.insert(HOST, value);
    }
    parts.headers.remove("proxy-connection");

    Ok(Request::from_parts(parts, body))
}
