//! Stateless WebSocket server for the Monopoly turn engine.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod protocol;
mod server;

use config::ServerConfig;
use monopoly_core::Engine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    let catalog = config.load_catalog()?;
    match &config.catalog_path {
        Some(path) => info!("Loaded catalog from {}", path.display()),
        None => info!("Using the standard catalog"),
    }

    info!("Starting Monopoly server...");

    let engine = Arc::new(Engine::new(catalog));

    server::run_server(config.addr, engine).await
}
