//! snplit — variant and literature lookup tools.
//! Entry point for the stdio tool server.

mod config;
mod tools;
mod transport;

use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    // Initialise structured logging. stdout carries responses, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("snplit=debug,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("🧬 snplit starting up...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration. Only a missing file falls back to defaults.
    let mut config = config::Config::load()?;
    info!("Configuration loaded.");
    config.apply_env_overrides(|key| std::env::var(key).ok());

    // Register snplit tools
    let registry = tools::build_default_registry(&config)?;
    info!("✅ Tool registry ready. Reading JSON requests from stdin.");

    transport::serve(&registry, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;

    info!("stdin closed, shutting down.");
    Ok(())
}
