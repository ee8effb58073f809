//! Sensor Registry - Main Entry Point

use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("=== Sensor Registry v{} ===", env!("CARGO_PKG_VERSION"));

    run_server(config).await
}
