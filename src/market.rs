//! Markets, tokens and display precision

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BookError, Result};

/// 0x ERC20 asset proxy id, prefix of every ERC20 asset data blob
const ERC20_PROXY_ID: &str = "0xf47261b0";

/// Decimals shown for order sizes when a market does not override it
pub const DEFAULT_BASE_PRECISION: u32 = 4;
/// Decimals shown for prices when a market does not override it
pub const DEFAULT_PRICE_PRECISION: u32 = 7;
/// Decimals shown for the spread percentage
pub const SPREAD_PERCENT_DECIMALS: u32 = 2;
/// Decimals shown for the bid side quote total
pub const QUOTE_TOTAL_DECIMALS: u32 = 2;

/// Trading pair, keyed as "BASE-QUOTE"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyPair {
    pub base: String,
    pub quote: String,
}

impl CurrencyPair {
    pub fn new(base: &str, quote: &str) -> Self {
        Self {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
        }
    }
}

impl FromStr for CurrencyPair {
    type Err = BookError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().split_once('-') {
            Some((base, quote)) if !base.is_empty() && !quote.is_empty() && !quote.contains('-') => {
                Ok(Self::new(base, quote))
            }
            _ => Err(BookError::InvalidPair(s.to_string())),
        }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

/// ERC20 token known to the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub symbol: String,
    pub address: String,
    pub decimals: u32,
}

impl Token {
    pub fn new(symbol: &str, address: &str, decimals: u32) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            address: address.to_lowercase(),
            decimals,
        }
    }

    /// ERC20 asset data: proxy id followed by the address padded to 32 bytes
    pub fn asset_data(&self) -> String {
        let address = self.address.trim_start_matches("0x");
        format!("{}{:0>64}", ERC20_PROXY_ID, address)
    }

    /// Convert a raw integer base-unit amount into token units
    pub fn to_units(&self, raw: &str) -> Result<Decimal> {
        let amount: i128 = raw
            .trim()
            .parse()
            .map_err(|e| BookError::ParseError(format!("Invalid amount {}: {}", raw, e)))?;

        Decimal::try_from_i128_with_scale(amount, self.decimals)
            .map(|d| d.normalize())
            .map_err(|e| {
                BookError::ParseError(format!(
                    "Amount {} does not fit {} decimals: {}",
                    raw, self.decimals, e
                ))
            })
    }
}

/// Display precision for a market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precision {
    pub base: u32,
    pub price: u32,
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_PRECISION,
            price: DEFAULT_PRICE_PRECISION,
        }
    }
}

/// A configured market: pair, both tokens and display precision
#[derive(Debug, Clone)]
pub struct Market {
    pub pair: CurrencyPair,
    pub base: Token,
    pub quote: Token,
    pub precision: Precision,
}

impl Market {
    /// Pair key used to look the market up ("BASE-QUOTE")
    pub fn key(&self) -> String {
        self.pair.to_string()
    }

    /// Whether an order trading `maker` for `taker` belongs to this market,
    /// in either direction
    pub fn matches_assets(&self, maker_asset_data: &str, taker_asset_data: &str) -> bool {
        let base = self.base.asset_data();
        let quote = self.quote.asset_data();
        let maker = maker_asset_data.to_lowercase();
        let taker = taker_asset_data.to_lowercase();

        (maker == base && taker == quote) || (maker == quote && taker == base)
    }
}
