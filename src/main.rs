//! PriceSync - sheet-driven price synchronization for Shopify stores
//!
//! Server entry point.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use pricesync_core::config::AppConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod server;
mod websocket;

/// Command-line options
#[derive(Debug, Parser)]
#[command(
    name = "pricesync",
    about = "Sheet-driven price synchronization server for Shopify stores",
    version
)]
struct Cli {
    /// Config file base name (extension resolved by the loader)
    #[arg(long, default_value = "config/default")]
    config: String,

    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pricesync=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load_from(&cli.config)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    info!("Starting PriceSync v{}", env!("CARGO_PKG_VERSION"));
    server::run(config).await
}
