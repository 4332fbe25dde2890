//! tilecast viewer entry point.

mod app;
mod config;
mod export;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting tilecast viewer"
    );

    let config = config::Config::load()?;
    tracing::info!(host = %config.host, port = config.port, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("viewer shut down cleanly");
    Ok(())
}
