//! # proptree-sync Agent
//!
//! `proptree-agent [send|receive] [endpoint]`
//!
//! Positional arguments override `PROPTREE_MODE` and `PROPTREE_ENDPOINT`.

use anyhow::Result;
use proptree_agent::{Agent, AgentConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting proptree-sync agent"
    );

    // Load configuration
    let config = AgentConfig::from_env()?.apply_args(std::env::args().skip(1))?;

    tracing::info!(mode = ?config.mode, endpoint = %config.endpoint, "Agent configured");

    // Run agent
    Agent::new(config).run().await?;

    Ok(())
}
