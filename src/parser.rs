//! Parser module for relayer messages
//!
//! Handles deserialization of standard relayer API order-book snapshots and
//! WebSocket order updates, and converts signed orders into price levels.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::{BookError, Result};
use crate::market::Market;
use crate::orderbook::{OrderBook, OrderBookItem, Side};

/// Signed 0x order; only the fields the book needs
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOrder {
    pub maker_address: String,
    pub maker_asset_amount: String,
    pub taker_asset_amount: String,
    pub maker_asset_data: String,
    pub taker_asset_data: String,
}

/// Relayer metadata attached to an order
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMetaData {
    pub remaining_fillable_taker_asset_amount: Option<String>,
}

/// Order record as returned by the relayer
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOrder {
    pub order: SignedOrder,
    #[serde(default)]
    pub meta_data: OrderMetaData,
}

/// Paginated record collection
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedCollection {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub per_page: u64,
    pub records: Vec<ApiOrder>,
}

/// `GET /orderbook` response
#[derive(Debug, Clone, Deserialize)]
pub struct OrderbookResponse {
    pub bids: PaginatedCollection,
    pub asks: PaginatedCollection,
}

/// Subscription request sent over the relayer WebSocket
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    #[serde(rename = "type")]
    pub message_type: String,
    pub channel: String,
    pub request_id: String,
}

impl SubscribeRequest {
    /// Subscribe to every order update
    pub fn orders() -> Self {
        Self {
            message_type: "subscribe".to_string(),
            channel: "orders".to_string(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelMessage {
    #[serde(rename = "type")]
    message_type: String,
    channel: String,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Parsed WebSocket message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    OrdersUpdate {
        request_id: Option<String>,
        orders: Vec<ApiOrder>,
    },
    Unknown(String),
}

impl ParsedMessage {
    /// Parse a raw WebSocket message
    pub fn parse(raw: &str) -> Result<Self> {
        let msg: ChannelMessage = match serde_json::from_str(raw) {
            Ok(msg) => msg,
            Err(_) => return Ok(ParsedMessage::Unknown(raw.to_string())),
        };

        if msg.message_type == "update" && msg.channel == "orders" {
            let orders: Vec<ApiOrder> = serde_json::from_value(msg.payload)?;
            return Ok(ParsedMessage::OrdersUpdate {
                request_id: msg.request_id,
                orders,
            });
        }

        Ok(ParsedMessage::Unknown(raw.to_string()))
    }
}

/// Price and base size of one order, in token units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Level {
    price: Decimal,
    size: Decimal,
}

/// Ask: maker sells base for quote
fn ask_level(market: &Market, record: &ApiOrder) -> Result<Level> {
    let base = market.base.to_units(&record.order.maker_asset_amount)?;
    let quote = market.quote.to_units(&record.order.taker_asset_amount)?;
    let price = quote.checked_div(base).unwrap_or(Decimal::ZERO);

    let size = match &record.meta_data.remaining_fillable_taker_asset_amount {
        Some(remaining) => {
            let remaining = market.quote.to_units(remaining)?;
            remaining
                .checked_div(quote)
                .and_then(|r| r.checked_mul(base))
                .ok_or_else(|| {
                    BookError::ParseError(format!(
                        "Remaining fillable {} does not scale to base size",
                        remaining
                    ))
                })?
        }
        None => base,
    };

    Ok(Level { price, size })
}

/// Bid: maker sells quote for base
fn bid_level(market: &Market, record: &ApiOrder) -> Result<Level> {
    let quote = market.quote.to_units(&record.order.maker_asset_amount)?;
    let base = market.base.to_units(&record.order.taker_asset_amount)?;
    let price = quote.checked_div(base).unwrap_or(Decimal::ZERO);

    let size = match &record.meta_data.remaining_fillable_taker_asset_amount {
        Some(remaining) => market.base.to_units(remaining)?,
        None => base,
    };

    Ok(Level { price, size })
}

fn is_own(record: &ApiOrder, account: Option<&str>) -> bool {
    account.is_some_and(|a| record.order.maker_address.eq_ignore_ascii_case(a))
}

/// Convert one side's records into merged levels plus the account's own orders
fn convert_side(
    market: &Market,
    side: Side,
    records: &[ApiOrder],
    account: Option<&str>,
) -> (BTreeMap<Decimal, Decimal>, Vec<OrderBookItem>) {
    let mut levels: BTreeMap<Decimal, Decimal> = BTreeMap::new();
    let mut own = Vec::new();

    for record in records {
        let level = match side {
            Side::Sell => ask_level(market, record),
            Side::Buy => bid_level(market, record),
        };

        let level = match level {
            Ok(level) if level.price > Decimal::ZERO && level.size > Decimal::ZERO => level,
            Ok(_) => continue,
            Err(e) => {
                warn!(pair = %market.pair, ?side, error = %e, "Skipping malformed order");
                continue;
            }
        };

        let price = level.price.normalize();
        let merged = levels.get(&price).copied().unwrap_or(Decimal::ZERO);
        let Some(merged) = merged.checked_add(level.size) else {
            warn!(pair = %market.pair, ?side, %price, "Skipping order whose size overflows its level");
            continue;
        };
        levels.insert(price, merged);

        if is_own(record, account) {
            own.push(OrderBookItem::new(side, price, level.size));
        }
    }

    (levels, own)
}

/// Build an order book snapshot from a relayer response.
///
/// Orders at equal prices merge into one level. Buy levels come out
/// descending, sell levels ascending.
pub fn book_from_response(
    market: &Market,
    response: &OrderbookResponse,
    account: Option<&str>,
) -> OrderBook {
    let (bids, mut my_size_orders) = convert_side(market, Side::Buy, &response.bids.records, account);
    let (asks, own_asks) = convert_side(market, Side::Sell, &response.asks.records, account);
    my_size_orders.extend(own_asks);

    OrderBook {
        buy_orders: bids
            .into_iter()
            .rev()
            .map(|(price, size)| OrderBookItem::new(Side::Buy, price, size))
            .collect(),
        sell_orders: asks
            .into_iter()
            .map(|(price, size)| OrderBookItem::new(Side::Sell, price, size))
            .collect(),
        my_size_orders,
    }
}
