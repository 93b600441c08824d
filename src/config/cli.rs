//! Command line and environment overrides.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::loader::{finalize, read_config, ConfigError};
use crate::config::schema::{AuthPolicy, ProxyConfig};

/// Load `KEY=value` pairs from an env file into the process environment,
/// ahead of argument parsing. Variables already set are left alone.
///
/// Returns `false` when the file does not exist.
pub fn load_env_file(path: &Path) -> Result<bool, dotenvy::Error> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(err) if err.not_found() => Ok(false),
        Err(err) => Err(err),
    }
}

/// Command line interface configuration
#[derive(Parser, Debug, Default)]
#[command(
    name = "socks-gate",
    version,
    about = "HTTP forward proxy over an upstream SOCKS5 server with admission control"
)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "SOCKS_GATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PROXY_PORT")]
    pub port: Option<u16>,

    /// Upstream SOCKS5 server (host:port)
    #[arg(short, long, env = "PROXY_SOCKS_ADDRESS", value_name = "HOST:PORT")]
    pub socks_address: Option<String>,

    /// Upstream SOCKS5 username
    #[arg(short = 'u', long, env = "PROXY_USER")]
    pub proxy_user: Option<String>,

    /// Upstream SOCKS5 password
    #[arg(short = 'P', long, env = "PROXY_PASSWORD", hide_env_values = true)]
    pub proxy_password: Option<String>,

    /// Maximum concurrent in-flight requests
    #[arg(long, env = "MAX_CONCURRENT_CONNECTIONS")]
    pub max_concurrent_connections: Option<usize>,

    /// Maximum admitted requests per second
    #[arg(long, env = "MAX_REQUESTS_PER_SECOND")]
    pub max_requests_per_second: Option<u32>,

    /// Accept every credential token
    #[arg(long)]
    pub allow_all: bool,

    /// Accepted credential token (repeatable)
    #[arg(long = "token", value_name = "TOKEN")]
    pub tokens: Vec<String>,
}

impl Cli {
    /// Apply overrides on top of a file-based (or default) configuration.
    pub fn apply(self, config: &mut ProxyConfig) {
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(addr) = self.socks_address {
            config.upstream.socks_address = addr;
        }
        if let Some(user) = self.proxy_user {
            config.upstream.username = user;
        }
        if let Some(password) = self.proxy_password {
            config.upstream.password = password;
        }
        if let Some(max) = self.max_concurrent_connections {
            config.limits.max_concurrent_connections = max;
        }
        if let Some(rps) = self.max_requests_per_second {
            config.limits.max_requests_per_second = rps;
        }
        if self.allow_all {
            config.auth.policy = AuthPolicy::AllowAll;
        }
        config.auth.tokens.extend(self.tokens);
    }

    /// Build the final, validated configuration.
    pub fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };
        self.apply(&mut config);
        finalize(config)
    }
}
