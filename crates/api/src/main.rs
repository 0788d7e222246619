//! Drive Monitor - Main Entry Point

use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("=== Drive Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Inference backend: {}", config.backend.base_url);

    run_server(config).await
}
