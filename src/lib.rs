//! Relayer order book service library
//!
//! This crate keeps the order books of 0x relayer markets, aggregates them
//! to a display depth, tracks the spread and the current account's size per
//! level, and turns row clicks into suggested order amounts.

use std::sync::Arc;
use tokio::sync::RwLock;

pub mod config;
pub mod error;
pub mod market;
pub mod metrics;
pub mod orderbook;
pub mod parser;
pub mod publisher;
pub mod relayer;
pub mod server;

pub use config::Config;
pub use error::{BookError, Result};
pub use market::{CurrencyPair, Market, Precision, Token};
pub use metrics::Metrics;
pub use orderbook::{
    aggregate, annotate, select_price, BookAction, BookOption, BookStore, BookView, Depth,
    OrderBook, OrderBookItem, PriceSelection, Side, Spread,
};
pub use publisher::{BookFrame, Publisher};
pub use relayer::{FeedManager, RelayerClient, SnapshotSource};

/// Application state shared across components
pub struct AppState {
    pub store: Arc<RwLock<BookStore>>,
    pub publisher: Arc<Publisher>,
    pub metrics: Arc<Metrics>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build the state and register every configured market
    pub fn new(config: Arc<Config>, publisher: Arc<Publisher>, metrics: Arc<Metrics>) -> Self {
        let mut store = BookStore::new(config.default_depth, config.account_address.is_some());
        for market in &config.markets {
            store.register(market.clone());
        }

        Self {
            store: Arc::new(RwLock::new(store)),
            publisher,
            metrics,
            config,
        }
    }

    /// Apply an action to one market and push the resulting frame to the UI.
    ///
    /// The frame is built under the same write guard as the dispatch.
    pub async fn apply(&self, pair: &str, action: BookAction) -> Result<BookFrame> {
        let frame = {
            let mut store = self.store.write().await;
            store.dispatch(pair, action)?;
            store
                .get(pair)
                .map(BookFrame::of)
                .ok_or_else(|| BookError::UnknownMarket(pair.to_string()))?
        };

        self.publisher.publish(&frame).await?;
        Ok(frame)
    }
}
