//! Book table view
//!
//! Combines the aggregated sides, the spread and the my-size overlay into the
//! rows a client displays, and formats them at the market's precision.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::{aggregate, annotate, AggregatedSide, Depth, OrderBook, Side, Spread};
use crate::market::{Precision, QUOTE_TOTAL_DECIMALS, SPREAD_PERCENT_DECIMALS};

/// Which sides of the book are displayed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookOption {
    #[default]
    Both,
    Buy,
    Sell,
}

impl BookOption {
    pub fn shows(self, side: Side) -> bool {
        match (self, side) {
            (BookOption::Both, _) => true,
            (BookOption::Buy, Side::Buy) | (BookOption::Sell, Side::Sell) => true,
            _ => false,
        }
    }
}

/// One displayed price level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRow {
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    /// The account's size at this level, `None` when it has none
    pub my_size: Option<Decimal>,
}

/// The order book as displayed: truncated sides, totals and spread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookView {
    pub depth: Depth,
    pub option: BookOption,
    pub show_my_size: bool,
    /// Sell rows, in book order
    pub asks: Vec<BookRow>,
    /// Buy rows, in book order
    pub bids: Vec<BookRow>,
    /// Total size of the sell side, in base units
    pub ask_total_base: Decimal,
    /// Total value of the buy side, in quote units
    pub bid_total_quote: Decimal,
    pub spread: Option<Spread>,
    /// Own orders that matched no price level on their side
    pub unmatched_own_orders: usize,
    pub is_empty: bool,
}

impl BookView {
    pub fn build(book: &OrderBook, depth: Depth, option: BookOption, show_my_size: bool) -> Self {
        let sells = aggregate(Side::Sell, &book.sell_orders, depth);
        let buys = aggregate(Side::Buy, &book.buy_orders, depth);

        let mut unmatched_own_orders = 0;
        let mut rows_for = |agg: &AggregatedSide| -> Vec<BookRow> {
            let overlay = show_my_size.then(|| {
                let overlay = annotate(book.side(agg.side), &book.my_orders(agg.side));
                unmatched_own_orders += overlay.unmatched().len();
                overlay
            });

            if !option.shows(agg.side) {
                return Vec::new();
            }

            agg.visible
                .iter()
                .map(|o| BookRow {
                    side: o.side,
                    price: o.price,
                    size: o.size,
                    my_size: overlay.as_ref().and_then(|m| m.get(o.price)),
                })
                .collect()
        };

        let asks = rows_for(&sells);
        let bids = rows_for(&buys);

        Self {
            depth,
            option,
            show_my_size,
            asks,
            bids,
            ask_total_base: sells.total_size,
            bid_total_quote: buys.total_quote,
            spread: Spread::of(book),
            unmatched_own_orders,
            is_empty: book.is_empty(),
        }
    }

    /// Displayed row `index` on `side`
    pub fn row(&self, side: Side, index: usize) -> Option<&BookRow> {
        match side {
            Side::Sell => self.asks.get(index),
            Side::Buy => self.bids.get(index),
        }
    }

    pub fn render(&self, precision: &Precision) -> RenderedBook {
        let render_row = |row: &BookRow| RenderedRow {
            size: fixed(row.size, precision.base),
            price: fixed(row.price, precision.price),
            my_size: self.show_my_size.then(|| match row.my_size {
                Some(size) => fixed(size, precision.base),
                None => "-".to_string(),
            }),
        };

        RenderedBook {
            depth: self.depth.rows(),
            option: self.option,
            asks: self.asks.iter().map(render_row).collect(),
            bids: self.bids.iter().map(render_row).collect(),
            ask_total: fixed(self.ask_total_base, precision.base),
            bid_total: fixed(self.bid_total_quote, QUOTE_TOTAL_DECIMALS),
            spread_absolute: self.spread.map(|s| fixed(s.absolute, precision.price)),
            spread_percentage: self
                .spread
                .map(|s| fixed(s.percentage, SPREAD_PERCENT_DECIMALS)),
            is_empty: self.is_empty,
        }
    }
}

/// Display strings for one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedRow {
    pub size: String,
    pub price: String,
    /// `None` when the my-size column is hidden, `-` when the account has nothing there
    pub my_size: Option<String>,
}

/// Display strings for the whole table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedBook {
    pub depth: usize,
    pub option: BookOption,
    pub asks: Vec<RenderedRow>,
    pub bids: Vec<RenderedRow>,
    pub ask_total: String,
    pub bid_total: String,
    pub spread_absolute: Option<String>,
    pub spread_percentage: Option<String>,
    pub is_empty: bool,
}

/// Fixed-point formatting, rounding half away from zero
fn fixed(value: Decimal, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", decimals as usize, rounded)
}
