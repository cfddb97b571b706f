//! Price-click selection
//!
//! Clicking a row suggests an order at that price for the whole size the
//! market would have to walk through to reach it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use super::{OrderBookItem, Side};

/// Suggested price and amount for the order-entry form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSelection {
    pub side: Side,
    pub price: Decimal,
    pub cumulative_size: Decimal,
}

/// Cumulative size from the top of `same_side_orders` through the clicked level.
///
/// Buy clicks sum every level priced at or above the click, sell clicks every
/// level at or below it.
pub fn select_price(clicked: &OrderBookItem, same_side_orders: &[OrderBookItem]) -> PriceSelection {
    let cumulative_size = same_side_orders
        .iter()
        .filter(|o| match clicked.side {
            Side::Buy => o.price >= clicked.price,
            Side::Sell => o.price <= clicked.price,
        })
        .fold(Decimal::ZERO, |acc, o| acc.saturating_add(o.size));

    PriceSelection {
        side: clicked.side,
        price: clicked.price,
        cumulative_size,
    }
}

pub type SelectionReceiver = watch::Receiver<Option<PriceSelection>>;

/// Shared selection state read by the order-entry form.
///
/// Price and amount live in one value so a reader never sees one updated
/// without the other.
#[derive(Debug)]
pub struct SelectionPublisher {
    tx: watch::Sender<Option<PriceSelection>>,
}

impl SelectionPublisher {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn subscribe(&self) -> SelectionReceiver {
        self.tx.subscribe()
    }

    pub fn publish(&self, selection: PriceSelection) {
        debug!(
            side = ?selection.side,
            price = %selection.price,
            amount = %selection.cumulative_size,
            "Price selected"
        );
        self.tx.send_replace(Some(selection));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn current(&self) -> Option<PriceSelection> {
        *self.tx.borrow()
    }
}

impl Default for SelectionPublisher {
    fn default() -> Self {
        Self::new()
    }
}
