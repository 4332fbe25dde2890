//! tilecast test-pattern sender entry point.

mod app;
mod config;
mod render;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting tilecast sender");

    let config = config::Config::load()?;
    tracing::info!(host = %config.host, port = config.port, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    Ok(())
}
