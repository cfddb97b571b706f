//! Prometheus metrics
//!
//! Owns its own registry so several services can live in one process.

use prometheus::{Encoder, GaugeVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use rust_decimal::prelude::ToPrimitive;

use crate::error::{BookError, Result};
use crate::orderbook::BookView;

pub struct Metrics {
    registry: Registry,
    book_rebuilds: IntCounterVec,
    refresh_failures: IntCounterVec,
    reconnects: IntCounter,
    spread_percentage: GaugeVec,
    unmatched_own_orders: GaugeVec,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let book_rebuilds = IntCounterVec::new(
            Opts::new("orderbook_rebuilds_total", "Order book snapshots rebuilt"),
            &["pair"],
        )?;
        let refresh_failures = IntCounterVec::new(
            Opts::new("orderbook_refresh_failures_total", "Failed snapshot fetches"),
            &["pair"],
        )?;
        let reconnects = IntCounter::new(
            "orderbook_ws_reconnects_total",
            "Relayer WebSocket reconnections",
        )?;
        let spread_percentage = GaugeVec::new(
            Opts::new("orderbook_spread_percentage", "Best bid/ask spread in percent"),
            &["pair"],
        )?;
        let unmatched_own_orders = GaugeVec::new(
            Opts::new(
                "orderbook_unmatched_own_orders",
                "Own orders whose price matches no book level",
            ),
            &["pair"],
        )?;

        registry.register(Box::new(book_rebuilds.clone()))?;
        registry.register(Box::new(refresh_failures.clone()))?;
        registry.register(Box::new(reconnects.clone()))?;
        registry.register(Box::new(spread_percentage.clone()))?;
        registry.register(Box::new(unmatched_own_orders.clone()))?;

        Ok(Self {
            registry,
            book_rebuilds,
            refresh_failures,
            reconnects,
            spread_percentage,
            unmatched_own_orders,
        })
    }

    /// Record a rebuilt book and its derived figures
    pub fn record_rebuild(&self, pair: &str, view: &BookView) {
        self.book_rebuilds.with_label_values(&[pair]).inc();
        self.unmatched_own_orders
            .with_label_values(&[pair])
            .set(view.unmatched_own_orders as f64);

        let spread = view
            .spread
            .and_then(|s| s.percentage.to_f64())
            .unwrap_or(f64::NAN);
        self.spread_percentage.with_label_values(&[pair]).set(spread);
    }

    pub fn record_refresh_failure(&self, pair: &str) {
        self.refresh_failures.with_label_values(&[pair]).inc();
    }

    pub fn record_reconnect(&self) {
        self.reconnects.inc();
    }

    /// Encode every metric in the Prometheus text format
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| BookError::MetricsError(e.to_string()))
    }
}
