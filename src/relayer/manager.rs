//! Relayer feed manager
//!
//! Re-fetches order books on every WebSocket push and on a poll interval,
//! with automatic reconnection.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::{SnapshotSource, WebSocketClient};
use crate::error::{BookError, Result};
use crate::market::Market;
use crate::orderbook::BookAction;
use crate::parser::{ApiOrder, ParsedMessage};
use crate::AppState;

/// Maximum backoff delay in milliseconds (60 seconds)
const MAX_BACKOFF_MS: u64 = 60_000;
/// Cooldown period after which reconnect attempts are reset (5 minutes)
const RECONNECT_COOLDOWN_SECS: u64 = 300;
/// Send a keepalive ping after this long without data
const KEEPALIVE_SECS: u64 = 30;
/// Treat the socket as stale after this long without any frame
const RECV_TIMEOUT_SECS: u64 = 45;

/// Rebuilds books from a snapshot source and publishes them
pub struct BookRefresher<S> {
    source: S,
    state: Arc<AppState>,
}

impl<S: SnapshotSource> BookRefresher<S> {
    pub fn new(source: S, state: Arc<AppState>) -> Self {
        Self { source, state }
    }

    /// Fetch one market and replace its book. On failure the previous book stays.
    pub async fn refresh(&self, market: &Market) -> Result<()> {
        let pair = market.key();

        let book = match self.source.fetch_book(market).await {
            Ok(book) => book,
            Err(e) => {
                self.state.metrics.record_refresh_failure(&pair);
                return Err(e);
            }
        };

        let (bids, asks, own) = (
            book.buy_orders.len(),
            book.sell_orders.len(),
            book.my_size_orders.len(),
        );

        let frame = self.state.apply(&pair, BookAction::ReplaceBook(book)).await?;
        self.state.metrics.record_rebuild(&pair, &frame.view);

        debug!(pair = %pair, bids, asks, own, "Order book rebuilt");
        Ok(())
    }

    /// Refresh every configured market, logging failures
    pub async fn refresh_all(&self) {
        for market in &self.state.config.markets {
            if let Err(e) = self.refresh(market).await {
                warn!(pair = %market.pair, error = %e, "Failed to refresh order book");
            }
        }
    }

    /// Refresh the markets an order update touches
    pub async fn refresh_affected(&self, orders: &[ApiOrder]) {
        let affected = self.state.config.markets.iter().filter(|market| {
            orders.iter().any(|o| {
                market.matches_assets(&o.order.maker_asset_data, &o.order.taker_asset_data)
            })
        });

        for market in affected {
            if let Err(e) = self.refresh(market).await {
                warn!(pair = %market.pair, error = %e, "Failed to refresh order book");
            }
        }
    }
}

/// Manages the relayer WebSocket with automatic reconnection
pub struct FeedManager<S> {
    state: Arc<AppState>,
    refresher: BookRefresher<S>,
    client: WebSocketClient,
    reconnect_attempts: u32,
    last_successful_connection: Option<Instant>,
}

impl<S: SnapshotSource> FeedManager<S> {
    pub fn new(state: Arc<AppState>, source: S) -> Self {
        let client = WebSocketClient::new(&state.config.relayer_ws_url);
        let refresher = BookRefresher::new(source, state.clone());

        Self {
            state,
            refresher,
            client,
            reconnect_attempts: 0,
            last_successful_connection: None,
        }
    }

    /// Run the feed - runs indefinitely with automatic reconnection
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting relayer feed with infinite retry");

        loop {
            self.reset_after_cooldown();

            match self.connect_and_process().await {
                Ok(()) => {
                    info!("Feed processing completed normally, reconnecting...");
                    sleep(Duration::from_secs(1)).await;
                }
                Err(e) => {
                    error!(error = %e, "Relayer feed error");
                    self.client.close().await;
                    self.state.metrics.record_reconnect();
                    let delay = self.next_backoff();

                    warn!(
                        attempt = self.reconnect_attempts,
                        delay_secs = delay.as_secs(),
                        "Reconnecting after error..."
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// Forget earlier failures once a connection has been up past the cooldown
    fn reset_after_cooldown(&mut self) {
        let Some(last_success) = self.last_successful_connection else {
            return;
        };
        if last_success.elapsed() > Duration::from_secs(RECONNECT_COOLDOWN_SECS)
            && self.reconnect_attempts > 0
        {
            info!(
                previous_attempts = self.reconnect_attempts,
                "Resetting reconnect counter after cooldown period"
            );
            self.reconnect_attempts = 0;
        }
    }

    /// Count a failure and return the delay before the next attempt
    fn next_backoff(&mut self) -> Duration {
        self.reconnect_attempts += 1;
        let base_delay = self
            .state
            .config
            .reconnect_delay_ms
            .saturating_mul(2u64.pow(self.reconnect_attempts.min(6)));
        Duration::from_millis(base_delay.min(MAX_BACKOFF_MS))
    }

    /// Connect, load every book, then follow pushes and the poll timer
    async fn connect_and_process(&mut self) -> Result<()> {
        self.client.connect().await?;

        self.last_successful_connection = Some(Instant::now());
        info!(attempts = self.reconnect_attempts, "WebSocket connected");

        self.refresher.refresh_all().await;

        let mut poll = interval(Duration::from_secs(self.state.config.poll_interval_secs.max(1)));
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately and the books were just loaded
        poll.tick().await;

        let mut last_message = Instant::now();
        let keepalive_timeout = Duration::from_secs(KEEPALIVE_SECS);
        let recv_timeout = Duration::from_secs(RECV_TIMEOUT_SECS);

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    self.refresher.refresh_all().await;
                }
                received = timeout(recv_timeout, self.client.recv()) => match received {
                    Ok(Ok(Some(text))) => {
                        last_message = Instant::now();
                        if let Err(e) = self.process_message(&text).await {
                            warn!(error = %e, "Failed to process message");
                        }
                    }
                    Ok(Ok(None)) => {
                        if last_message.elapsed() > keepalive_timeout {
                            if let Err(e) = self.client.ping().await {
                                warn!(error = %e, "Failed to send keepalive ping");
                            }
                        }
                    }
                    Ok(Err(e)) => return Err(e),
                    Err(_) => {
                        warn!(
                            last_message_secs = last_message.elapsed().as_secs(),
                            "No message received within timeout, sending keepalive"
                        );
                        if let Err(e) = self.client.ping().await {
                            warn!(error = %e, "Failed to send keepalive ping, reconnecting");
                            return Err(BookError::ConnectionTimeout);
                        }
                    }
                },
            }
        }
    }

    /// Process a single WebSocket message
    async fn process_message(&self, raw: &str) -> Result<()> {
        match ParsedMessage::parse(raw)? {
            ParsedMessage::OrdersUpdate { request_id, orders } => {
                if let (Some(theirs), Some(ours)) = (request_id.as_deref(), self.client.request_id()) {
                    if theirs != ours {
                        tracing::trace!(request_id = %theirs, "Update for another subscription");
                        return Ok(());
                    }
                }
                debug!(orders = orders.len(), "Order update received");
                self.refresher.refresh_affected(&orders).await;
            }
            ParsedMessage::Unknown(msg) => {
                tracing::trace!(msg = %msg, "Unknown message type");
            }
        }

        Ok(())
    }
}

/// Log best prices and spread of every market on an interval
pub fn spawn_status_logger(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(state.config.health_check_interval_secs.max(1)));
        loop {
            ticker.tick().await;
            let store = state.store.read().await;
            for pair in store.pairs() {
                let Some(market) = store.get(&pair) else {
                    continue;
                };
                let book = market.book();
                let spread = market.view().spread;
                info!(
                    pair = %pair,
                    best_bid = ?book.best_bid(),
                    best_ask = ?book.best_ask(),
                    spread = ?spread.map(|s| s.absolute),
                    spread_pct = ?spread.map(|s| s.percentage),
                    depth = market.depth().rows(),
                    "Order book status"
                );
            }
        }
    })
}

/// Log every price selection as it is published, one task per market
pub async fn spawn_selection_logger(state: Arc<AppState>) -> Vec<JoinHandle<()>> {
    let store = state.store.read().await;
    store
        .pairs()
        .into_iter()
        .filter_map(|pair| store.subscribe_selection(&pair).map(|rx| (pair, rx)))
        .map(|(pair, mut rx)| {
            tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let selection = *rx.borrow_and_update();
                    match selection {
                        Some(s) => info!(
                            pair = %pair,
                            side = ?s.side,
                            price = %s.price,
                            amount = %s.cumulative_size,
                            "Price selected"
                        ),
                        None => debug!(pair = %pair, "Price selection cleared"),
                    }
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::metrics::Metrics;
    use crate::orderbook::{OrderBook, OrderBookItem, Side};
    use crate::publisher::Publisher;
    use crate::relayer::MockSnapshotSource;
    use rust_decimal_macros::dec;

    async fn app_state(dir: &tempfile::TempDir) -> Arc<AppState> {
        let path = dir.path().join("book.sock");
        let publisher = Publisher::new(path.to_str().unwrap()).await.unwrap();
        Arc::new(AppState::new(
            Arc::new(Config::default()),
            Arc::new(publisher),
            Arc::new(Metrics::new().unwrap()),
        ))
    }

    fn book() -> OrderBook {
        OrderBook {
            buy_orders: vec![OrderBookItem::new(Side::Buy, dec!(0.5), dec!(10))],
            sell_orders: vec![OrderBookItem::new(Side::Sell, dec!(0.6), dec!(4))],
            my_size_orders: vec![],
        }
    }

    fn order_json(maker_asset_data: &str, taker_asset_data: &str) -> serde_json::Value {
        serde_json::json!({
            "order": {
                "makerAddress": "0x01",
                "makerAssetAmount": "1",
                "takerAssetAmount": "1",
                "makerAssetData": maker_asset_data,
                "takerAssetData": taker_asset_data
            }
        })
    }

    fn order(maker_asset_data: &str, taker_asset_data: &str) -> ApiOrder {
        serde_json::from_value(order_json(maker_asset_data, taker_asset_data)).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_replaces_book() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;

        let mut source = MockSnapshotSource::new();
        source
            .expect_fetch_book()
            .withf(|market| market.key() == "ZRX-WETH")
            .times(1)
            .returning(|_| Ok(book()));

        let refresher = BookRefresher::new(source, state.clone());
        let market = state.config.markets[0].clone();
        refresher.refresh(&market).await.unwrap();

        let store = state.store.read().await;
        assert_eq!(store.get("ZRX-WETH").unwrap().book(), &book());
        drop(store);
        assert!(state
            .metrics
            .encode()
            .unwrap()
            .contains("orderbook_rebuilds_total{pair=\"ZRX-WETH\"} 1"));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_book() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;
        state
            .store
            .write()
            .await
            .dispatch("ZRX-WETH", BookAction::ReplaceBook(book()))
            .unwrap();

        let mut source = MockSnapshotSource::new();
        source
            .expect_fetch_book()
            .returning(|_| Err(BookError::RestApiError("503".to_string())));

        let refresher = BookRefresher::new(source, state.clone());
        let market = state.config.markets[0].clone();
        assert!(refresher.refresh(&market).await.is_err());

        assert_eq!(state.store.read().await.get("ZRX-WETH").unwrap().book(), &book());
        assert!(state
            .metrics
            .encode()
            .unwrap()
            .contains("orderbook_refresh_failures_total{pair=\"ZRX-WETH\"} 1"));
    }

    #[tokio::test]
    async fn test_refresh_affected_filters_by_assets() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;
        let market = state.config.markets[0].clone();
        let base = market.base.asset_data();
        let quote = market.quote.asset_data();

        let mut source = MockSnapshotSource::new();
        source.expect_fetch_book().times(1).returning(|_| Ok(book()));
        let refresher = BookRefresher::new(source, state.clone());

        refresher.refresh_affected(&[order("0xdead", "0xbeef")]).await;
        refresher.refresh_affected(&[order(&quote, &base)]).await;

        assert_eq!(state.store.read().await.get("ZRX-WETH").unwrap().book(), &book());
    }

    fn update(request_id: &str, orders: &[serde_json::Value]) -> String {
        serde_json::json!({
            "type": "update",
            "channel": "orders",
            "requestId": request_id,
            "payload": orders,
        })
        .to_string()
    }

    fn zrx_weth_order(state: &AppState) -> serde_json::Value {
        let market = &state.config.markets[0];
        order_json(&market.base.asset_data(), &market.quote.asset_data())
    }

    #[tokio::test]
    async fn test_update_for_another_subscription_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;

        let mut source = MockSnapshotSource::new();
        source.expect_fetch_book().times(0);
        let mut feed = FeedManager::new(state.clone(), source);
        feed.client = WebSocketClient::subscribed("ws://localhost:3001", "ours");

        let raw = update("theirs", &[zrx_weth_order(&state)]);
        feed.process_message(&raw).await.unwrap();

        assert!(state.store.read().await.get("ZRX-WETH").unwrap().book().is_empty());
    }

    #[tokio::test]
    async fn test_update_for_our_subscription_refreshes_market() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;

        let mut source = MockSnapshotSource::new();
        source.expect_fetch_book().times(1).returning(|_| Ok(book()));
        let mut feed = FeedManager::new(state.clone(), source);
        feed.client = WebSocketClient::subscribed("ws://localhost:3001", "ours");

        let raw = update("ours", &[zrx_weth_order(&state)]);
        feed.process_message(&raw).await.unwrap();

        assert_eq!(state.store.read().await.get("ZRX-WETH").unwrap().book(), &book());
    }

    #[tokio::test]
    async fn test_backoff_grows_until_cooldown() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;
        let mut feed = FeedManager::new(state, MockSnapshotSource::new());

        // Connections that drop right away keep backing off
        feed.last_successful_connection = Some(Instant::now());
        let delays: Vec<u64> = (0..3)
            .map(|_| {
                feed.reset_after_cooldown();
                feed.next_backoff().as_millis() as u64
            })
            .collect();
        assert_eq!(delays, vec![6_000, 12_000, 24_000]);

        feed.reconnect_attempts = 10;
        assert_eq!(feed.next_backoff(), Duration::from_millis(MAX_BACKOFF_MS));

        feed.last_successful_connection =
            Instant::now().checked_sub(Duration::from_secs(RECONNECT_COOLDOWN_SECS + 1));
        feed.reset_after_cooldown();
        assert_eq!(feed.reconnect_attempts, 0);
    }

    #[tokio::test]
    async fn test_selection_logger_follows_each_market() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;

        let handles = spawn_selection_logger(state.clone()).await;
        assert_eq!(handles.len(), state.config.markets.len());
        for handle in handles {
            assert!(!handle.is_finished());
            handle.abort();
        }
    }
}
