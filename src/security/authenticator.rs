//! Credential check applied to admitted requests.

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName};

use crate::config::{AuthConfig, AuthPolicy};

/// Allow/deny decision over the raw credential token of a request.
///
/// The token is the raw value of the configured authorization header, or the
/// empty string when the header is absent or not valid UTF-8.
pub trait Authenticator: Send + Sync {
    fn is_authorized(&self, token: &str) -> bool;
}

impl<F> Authenticator for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_authorized(&self, token: &str) -> bool {
        self(token)
    }
}

/// Accepts every token. Only used when explicitly configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authenticator for AllowAll {
    fn is_authorized(&self, _token: &str) -> bool {
        true
    }
}

/// Accepts exactly the configured tokens. An empty list denies everything.
#[derive(Debug, Clone, Default)]
pub struct TokenAllowList {
    tokens: HashSet<String>,
}

impl TokenAllowList {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Authenticator for TokenAllowList {
    fn is_authorized(&self, token: &str) -> bool {
        !token.is_empty() && self.tokens.contains(token)
    }
}

/// Build the authenticator selected by configuration.
pub fn from_config(config: &AuthConfig) -> Arc<dyn Authenticator> {
    match config.policy {
        AuthPolicy::AllowAll => {
            tracing::warn!("Credential policy is allow_all; every request is authorized");
            Arc::new(AllowAll)
        }
        AuthPolicy::Tokens => {
            let list = TokenAllowList::new(config.tokens.iter().cloned());
            if list.is_empty() {
                tracing::warn!("Credential policy has no tokens; every request will be rejected");
            } else {
                tracing::info!(tokens = list.len(), "Credential allow-list loaded");
            }
            Arc::new(list)
        }
    }
}

/// Raw credential token carried by `header`, or `""`.
pub fn credential_token<'a>(headers: &'a HeaderMap, header: &HeaderName) -> &'a str {
    headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
