//! Depth aggregation and spread

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{OrderBook, OrderBookItem, Side};
use crate::error::BookError;

/// Number of price levels displayed per side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum Depth {
    #[default]
    Five,
    Ten,
    Twenty,
    Fifty,
}

impl Depth {
    pub const ALL: [Depth; 4] = [Depth::Five, Depth::Ten, Depth::Twenty, Depth::Fifty];

    pub fn rows(self) -> usize {
        match self {
            Depth::Five => 5,
            Depth::Ten => 10,
            Depth::Twenty => 20,
            Depth::Fifty => 50,
        }
    }
}

impl TryFrom<usize> for Depth {
    type Error = BookError;

    fn try_from(rows: usize) -> Result<Self, Self::Error> {
        Depth::ALL
            .into_iter()
            .find(|d| d.rows() == rows)
            .ok_or(BookError::InvalidDepth(rows))
    }
}

impl From<Depth> for usize {
    fn from(depth: Depth) -> Self {
        depth.rows()
    }
}

impl FromStr for Depth {
    type Err = BookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rows: usize = s
            .trim()
            .parse()
            .map_err(|_| BookError::ConfigError(format!("Depth is not a number: {}", s)))?;
        Depth::try_from(rows)
    }
}

/// One side of the book after truncation to the display depth
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedSide {
    pub side: Side,
    /// Rows nearest the spread, at most `depth` of them
    pub visible: Vec<OrderBookItem>,
    /// Sum of sizes over the whole side, not only the visible rows
    pub total_size: Decimal,
    /// Sum of size * price over the whole side
    pub total_quote: Decimal,
}

/// Truncate one side of the book to `depth` rows and total it.
///
/// Sell orders keep the last `depth` entries, buy orders the first `depth`.
/// Totals saturate at `Decimal::MAX` instead of overflowing.
pub fn aggregate(side: Side, orders: &[OrderBookItem], depth: Depth) -> AggregatedSide {
    let rows = depth.rows().min(orders.len());
    let visible = match side {
        Side::Sell => &orders[orders.len() - rows..],
        Side::Buy => &orders[..rows],
    };

    AggregatedSide {
        side,
        visible: visible.to_vec(),
        total_size: orders
            .iter()
            .fold(Decimal::ZERO, |acc, o| acc.saturating_add(o.size)),
        total_quote: orders
            .iter()
            .fold(Decimal::ZERO, |acc, o| acc.saturating_add(o.size.saturating_mul(o.price))),
    }
}

/// Gap between best bid and best ask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spread {
    pub absolute: Decimal,
    /// absolute / best ask * 100
    pub percentage: Decimal,
}

impl Spread {
    /// `None` when the best ask is zero or the percentage does not fit a `Decimal`
    pub fn between(best_bid: Decimal, best_ask: Decimal) -> Option<Self> {
        let absolute = best_ask.checked_sub(best_bid)?;
        let percentage = absolute
            .checked_div(best_ask)?
            .checked_mul(Decimal::ONE_HUNDRED)?;
        Some(Self {
            absolute,
            percentage,
        })
    }

    /// Spread of a book; `None` when either side is empty
    pub fn of(book: &OrderBook) -> Option<Self> {
        Self::between(book.best_bid()?, book.best_ask()?)
    }
}
