//! Obesity Prediction Service - Main Entry Point

use api::config::AppConfig;
use api::{init_logging, run_server};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("=== Obesity Prediction Service v{} ===", env!("CARGO_PKG_VERSION"));

    run_server(config).await
}
