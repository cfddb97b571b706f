//! Book store
//!
//! Holds the view-state of every configured market.

use std::collections::HashMap;

use super::{BookAction, BookView, BookViewState, Depth, PriceSelection, SelectionReceiver};
use crate::error::{BookError, Result};
use crate::market::Market;

/// View-state for all markets, keyed by "BASE-QUOTE"
#[derive(Debug, Default)]
pub struct BookStore {
    markets: HashMap<String, BookViewState>,
    default_depth: Depth,
    show_my_size: bool,
}

impl BookStore {
    /// Create a store; `show_my_size` is set when an account is configured
    pub fn new(default_depth: Depth, show_my_size: bool) -> Self {
        Self {
            markets: HashMap::new(),
            default_depth,
            show_my_size,
        }
    }

    /// Track a market with an empty book
    pub fn register(&mut self, market: Market) {
        let key = market.key();
        let state = BookViewState::new(market, self.default_depth, self.show_my_size);
        self.markets.insert(key, state);
    }

    /// Apply an action to one market
    pub fn dispatch(&mut self, pair: &str, action: BookAction) -> Result<Option<PriceSelection>> {
        let state = self
            .markets
            .get_mut(&normalize_key(pair))
            .ok_or_else(|| BookError::UnknownMarket(pair.to_string()))?;
        Ok(state.dispatch(action))
    }

    pub fn get(&self, pair: &str) -> Option<&BookViewState> {
        self.markets.get(&normalize_key(pair))
    }

    /// Current view of one market
    pub fn view(&self, pair: &str) -> Option<BookView> {
        self.get(pair).map(|state| state.view())
    }

    pub fn subscribe_selection(&self, pair: &str) -> Option<SelectionReceiver> {
        self.get(pair).map(|state| state.subscribe_selection())
    }

    /// Pair keys being tracked, sorted
    pub fn pairs(&self) -> Vec<String> {
        let mut pairs: Vec<String> = self.markets.keys().cloned().collect();
        pairs.sort();
        pairs
    }
}

fn normalize_key(pair: &str) -> String {
    pair.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{CurrencyPair, Precision, Token};
    use crate::orderbook::{OrderBook, OrderBookItem, Side};
    use rust_decimal_macros::dec;

    fn store() -> BookStore {
        let mut store = BookStore::new(Depth::Ten, false);
        store.register(Market {
            pair: CurrencyPair::new("ZRX", "WETH"),
            base: Token::new("ZRX", "0xe41d2489571d322189246dafa5ebde1f4699f498", 18),
            quote: Token::new("WETH", "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", 18),
            precision: Precision::default(),
        });
        store
    }

    #[test]
    fn test_register_and_lookup() {
        let store = store();
        assert!(store.get("ZRX-WETH").is_some());
        assert!(store.get("zrx-weth").is_some());
        assert_eq!(store.pairs(), vec!["ZRX-WETH".to_string()]);
        assert_eq!(store.get("ZRX-WETH").unwrap().depth(), Depth::Ten);
        assert!(store.view("ZRX-WETH").unwrap().is_empty);
    }

    #[test]
    fn test_dispatch_unknown_market() {
        let mut store = store();
        let result = store.dispatch("MKR-DAI", BookAction::ClearSelection);
        assert!(matches!(result, Err(BookError::UnknownMarket(_))));
    }

    #[test]
    fn test_dispatch_replaces_book() {
        let mut store = store();
        let book = OrderBook {
            buy_orders: vec![OrderBookItem::new(Side::Buy, dec!(0.5), dec!(10))],
            ..Default::default()
        };
        store
            .dispatch("ZRX-WETH", BookAction::ReplaceBook(book.clone()))
            .unwrap();
        assert_eq!(store.get("ZRX-WETH").unwrap().book(), &book);
    }
}
