use std::path::Path;

use clap::Parser;

use socks_gate::config::cli::load_env_file;
use socks_gate::config::Cli;
use socks_gate::lifecycle::startup;
use socks_gate::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_file_loaded = load_env_file(Path::new(".env"))?;
    let config = Cli::parse().into_config()?;
    logging::init_logging(&config.observability);
    if env_file_loaded {
        tracing::debug!("Loaded environment from .env");
    }

    tracing::info!(
        listen = %config.listen_addr(),
        upstream = %config.upstream.socks_address,
        max_concurrent_connections = config.limits.max_concurrent_connections,
        max_requests_per_second = config.limits.max_requests_per_second,
        auth_policy = ?config.auth.policy,
        "socks-gate v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if let Err(err) = startup::run(config).await {
        tracing::error!(error = %err, "Fatal startup error");
        return Err(err.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
