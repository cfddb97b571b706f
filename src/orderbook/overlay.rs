//! My-size overlay
//!
//! Attributes the current account's open orders to the book's price levels.

use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::OrderBookItem;

/// Own size per price level of one book side
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MySizeOverlay {
    sizes: BTreeMap<Decimal, Decimal>,
    unmatched: Vec<OrderBookItem>,
}

impl MySizeOverlay {
    /// Own size at `price`, `None` when the account has nothing there
    pub fn get(&self, price: Decimal) -> Option<Decimal> {
        self.sizes.get(&price.normalize()).copied()
    }

    /// Own orders whose price matches no level of the book side
    pub fn unmatched(&self) -> &[OrderBookItem] {
        &self.unmatched
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

/// Sum `my_orders` per price level of `book_side`.
///
/// Prices must match exactly after normalization.
pub fn annotate(book_side: &[OrderBookItem], my_orders: &[OrderBookItem]) -> MySizeOverlay {
    let levels: BTreeSet<Decimal> = book_side.iter().map(|o| o.price.normalize()).collect();

    let mut sizes: BTreeMap<Decimal, Decimal> = BTreeMap::new();
    let mut unmatched = Vec::new();

    for mine in my_orders {
        let price = mine.price.normalize();
        if levels.contains(&price) {
            let total = sizes.entry(price).or_insert(Decimal::ZERO);
            *total = total.saturating_add(mine.size);
        } else {
            unmatched.push(*mine);
        }
    }

    sizes.retain(|_, size| !size.is_zero());

    if !unmatched.is_empty() {
        debug!(
            count = unmatched.len(),
            "Own orders at prices missing from the book"
        );
    }

    MySizeOverlay { sizes, unmatched }
}
