//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Admitted request (holding a slot, past the rate ticker):
//!     → credential_token() reads the configured header
//!     → Authenticator decides allow/deny
//!     → deny: 401, allow: forward
//! ```
//!
//! # Design Decisions
//! - Policy is pluggable behind a trait object
//! - Fail closed: an empty allow-list rejects every request
//! - Allow-all exists but must be selected explicitly

pub mod authenticator;

pub use authenticator::{credential_token, AllowAll, Authenticator, TokenAllowList};
