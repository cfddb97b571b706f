//! Relayer Order Book Service
//!
//! Follows 0x relayer markets, keeps their aggregated order books and
//! publishes view frames and price selections to the UI process.

use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use relayer_orderbook::relayer::{spawn_selection_logger, spawn_status_logger};
use relayer_orderbook::{server, AppState, Config, FeedManager, Metrics, Publisher, RelayerClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Starting relayer order book service");

    let config = Arc::new(Config::load()?);
    let pairs: Vec<String> = config.markets.iter().map(|m| m.key()).collect();
    info!(
        markets = ?pairs,
        relayer = %config.relayer_url,
        account = ?config.account_address,
        depth = config.default_depth.rows(),
        "Configuration loaded"
    );

    let publisher = Arc::new(Publisher::new(&config.ipc_socket_path).await?);
    let metrics = Arc::new(Metrics::new()?);
    let state = Arc::new(AppState::new(config.clone(), publisher, metrics));

    let server_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = server::serve(server_state).await {
            warn!(error = %e, "HTTP server error");
        }
    });

    spawn_status_logger(state.clone());
    spawn_selection_logger(state.clone()).await;

    let source = RelayerClient::new(
        &config.relayer_url,
        config.per_page,
        config.account_address.clone(),
    );
    let mut feed = FeedManager::new(state, source);
    feed.run().await?;

    Ok(())
}
