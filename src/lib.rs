//! HTTP forward proxy over an upstream SOCKS5 server, with admission control.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                     SOCKS GATE                        │
//!                      │                                                       │
//!   Client Request     │  ┌────────┐   ┌─────────────────────────────────┐    │
//!   ───────────────────┼─▶│  http  │──▶│          admission gate         │    │
//!                      │  │ server │   │ slots ─▶ ticker ─▶ auth ─▶ fwd  │────┼──▶ SOCKS5 ──▶ Origin
//!   Client Response    │  │        │   │   │429      │       │401   │500 │    │
//!   ◀──────────────────┼──│        │◀──│   ▼         ▼       ▼      ▼    │◀───┼───
//!                      │  └────────┘   └─────────────────────────────────┘    │
//!                      │                                                       │
//!                      │  config · observability · lifecycle · admin           │
//!                      └──────────────────────────────────────────────────────┘
//! ```

pub mod admin;
pub mod admission;
pub mod config;
pub mod forward;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use admission::{AdmissionGate, Outcome};
pub use config::ProxyConfig;
pub use forward::{ForwardError, Forwarder};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use security::Authenticator;
