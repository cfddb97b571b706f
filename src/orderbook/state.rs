//! Per-market view-state and the actions that change it

use tracing::debug;

use super::{
    select_price, BookOption, BookView, Depth, OrderBook, PriceSelection, SelectionPublisher,
    SelectionReceiver, Side,
};
use crate::market::Market;

/// Every change a client or the relayer feed can make to a market's view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookAction {
    /// A fresh snapshot from the relayer replaces the previous one
    ReplaceBook(OrderBook),
    SetDepth(Depth),
    SetBookOption(BookOption),
    /// Click on displayed row `index` of `side`
    ClickRow { side: Side, index: usize },
    ClearSelection,
}

/// Book snapshot plus the display preferences of one market
#[derive(Debug)]
pub struct BookViewState {
    market: Market,
    book: OrderBook,
    depth: Depth,
    option: BookOption,
    show_my_size: bool,
    selection: SelectionPublisher,
}

impl BookViewState {
    pub fn new(market: Market, depth: Depth, show_my_size: bool) -> Self {
        Self {
            market,
            book: OrderBook::default(),
            depth,
            option: BookOption::default(),
            show_my_size,
            selection: SelectionPublisher::new(),
        }
    }

    /// Apply an action. Returns the selection when the action produced one.
    pub fn dispatch(&mut self, action: BookAction) -> Option<PriceSelection> {
        match action {
            BookAction::ReplaceBook(book) => {
                self.book = book;
                None
            }
            BookAction::SetDepth(depth) => {
                self.depth = depth;
                None
            }
            BookAction::SetBookOption(option) => {
                self.option = option;
                None
            }
            BookAction::ClickRow { side, index } => self.click(side, index),
            BookAction::ClearSelection => {
                self.selection.clear();
                None
            }
        }
    }

    fn click(&self, side: Side, index: usize) -> Option<PriceSelection> {
        let view = self.view();
        let Some(row) = view.row(side, index) else {
            debug!(pair = %self.market.pair, ?side, index, "Click outside displayed rows");
            return None;
        };

        let clicked = self
            .book
            .side(side)
            .iter()
            .find(|o| o.price == row.price)?;
        let selection = select_price(clicked, self.book.side(side));
        self.selection.publish(selection);
        Some(selection)
    }

    pub fn view(&self) -> BookView {
        BookView::build(&self.book, self.depth, self.option, self.show_my_size)
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn depth(&self) -> Depth {
        self.depth
    }

    pub fn selection(&self) -> Option<PriceSelection> {
        self.selection.current()
    }

    pub fn subscribe_selection(&self) -> SelectionReceiver {
        self.selection.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{CurrencyPair, Precision, Token};
    use crate::orderbook::OrderBookItem;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn test_market() -> Market {
        Market {
            pair: CurrencyPair::new("ZRX", "WETH"),
            base: Token::new("ZRX", "0xe41d2489571d322189246dafa5ebde1f4699f498", 18),
            quote: Token::new("WETH", "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", 18),
            precision: Precision::default(),
        }
    }

    fn sells(n: i64) -> Vec<OrderBookItem> {
        (0..n)
            .map(|i| OrderBookItem::new(Side::Sell, Decimal::from(102 + i), Decimal::ONE))
            .collect()
    }

    fn state_with_book() -> BookViewState {
        let mut state = BookViewState::new(test_market(), Depth::Five, true);
        state.dispatch(BookAction::ReplaceBook(OrderBook {
            buy_orders: vec![
                OrderBookItem::new(Side::Buy, dec!(101), dec!(2)),
                OrderBookItem::new(Side::Buy, dec!(100), dec!(5)),
                OrderBookItem::new(Side::Buy, dec!(99), dec!(3)),
            ],
            sell_orders: sells(8),
            my_size_orders: vec![],
        }));
        state
    }

    #[test]
    fn test_click_publishes_selection() {
        let mut state = state_with_book();
        let rx = state.subscribe_selection();

        let selection = state
            .dispatch(BookAction::ClickRow {
                side: Side::Buy,
                index: 1,
            })
            .unwrap();

        assert_eq!(selection.price, dec!(100));
        assert_eq!(selection.cumulative_size, dec!(7));
        assert_eq!(*rx.borrow(), Some(selection));
        assert_eq!(state.selection(), Some(selection));
    }

    #[test]
    fn test_click_uses_full_side_not_visible_rows() {
        let mut state = state_with_book();
        // Depth 5 of 8 sells shows 105..=109; the first visible row is 105
        let selection = state
            .dispatch(BookAction::ClickRow {
                side: Side::Sell,
                index: 0,
            })
            .unwrap();

        assert_eq!(selection.price, dec!(105));
        assert_eq!(selection.cumulative_size, dec!(4));
    }

    #[test]
    fn test_click_out_of_range_is_noop() {
        let mut state = state_with_book();
        let action = BookAction::ClickRow {
            side: Side::Buy,
            index: 3,
        };
        assert!(state.dispatch(action).is_none());
        assert!(state.selection().is_none());
    }

    #[test]
    fn test_click_on_hidden_side_is_noop() {
        let mut state = state_with_book();
        state.dispatch(BookAction::SetBookOption(BookOption::Sell));
        let action = BookAction::ClickRow {
            side: Side::Buy,
            index: 0,
        };
        assert!(state.dispatch(action).is_none());
    }

    #[test]
    fn test_depth_and_clear() {
        let mut state = state_with_book();
        state.dispatch(BookAction::SetDepth(Depth::Ten));
        assert_eq!(state.view().asks.len(), 8);

        state.dispatch(BookAction::ClickRow {
            side: Side::Buy,
            index: 0,
        });
        assert!(state.selection().is_some());
        state.dispatch(BookAction::ClearSelection);
        assert!(state.selection().is_none());
    }

    #[test]
    fn test_replace_book_discards_previous_snapshot() {
        let mut state = state_with_book();
        state.dispatch(BookAction::ReplaceBook(OrderBook::default()));
        assert!(state.view().is_empty);
        assert!(state.book().sell_orders.is_empty());
    }
}
