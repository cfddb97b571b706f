//! Order book module
//!
//! View-state for a relayer order book: depth aggregation, spread, the
//! price-click selection and the my-size overlay. Every snapshot is rebuilt
//! from scratch on each relayer push; rows are never mutated in place.

mod depth;
mod overlay;
mod selector;
mod state;
mod store;
mod view;

pub use depth::{aggregate, AggregatedSide, Depth, Spread};
pub use overlay::{annotate, MySizeOverlay};
pub use selector::{select_price, PriceSelection, SelectionPublisher, SelectionReceiver};
pub use state::{BookAction, BookViewState};
pub use store::BookStore;
pub use view::{BookOption, BookRow, BookView, RenderedBook, RenderedRow};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

/// A single row of the book: one price level on one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookItem {
    pub price: Decimal,
    pub size: Decimal,
    pub side: Side,
}

impl OrderBookItem {
    pub fn new(side: Side, price: Decimal, size: Decimal) -> Self {
        Self { price, size, side }
    }
}

/// Order book snapshot for one market
///
/// `buy_orders` is sorted by price descending and `sell_orders` ascending.
/// The aggregation functions rely on that ordering without checking it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    pub buy_orders: Vec<OrderBookItem>,
    pub sell_orders: Vec<OrderBookItem>,
    /// Open orders of the current account, both sides, one entry per order
    pub my_size_orders: Vec<OrderBookItem>,
}

impl OrderBook {
    /// Orders on one side of the book
    pub fn side(&self, side: Side) -> &[OrderBookItem] {
        match side {
            Side::Buy => &self.buy_orders,
            Side::Sell => &self.sell_orders,
        }
    }

    /// The current account's orders on one side
    pub fn my_orders(&self, side: Side) -> Vec<OrderBookItem> {
        self.my_size_orders
            .iter()
            .filter(|o| o.side == side)
            .copied()
            .collect()
    }

    /// Highest buy price
    pub fn best_bid(&self) -> Option<Decimal> {
        self.buy_orders.iter().map(|o| o.price).max()
    }

    /// Lowest sell price
    pub fn best_ask(&self) -> Option<Decimal> {
        self.sell_orders.iter().map(|o| o.price).min()
    }

    pub fn is_empty(&self) -> bool {
        self.buy_orders.is_empty() && self.sell_orders.is_empty()
    }
}
