//! Configuration module for the order book service

use std::collections::HashMap;
use std::env;

use crate::error::{BookError, Result};
use crate::market::{CurrencyPair, Market, Precision, Token};
use crate::orderbook::Depth;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Markets to track, with their tokens resolved
    pub markets: Vec<Market>,

    /// Relayer REST endpoint (standard relayer API v3)
    pub relayer_url: String,

    /// Relayer WebSocket endpoint
    pub relayer_ws_url: String,

    /// Account whose open orders feed the my-size column
    pub account_address: Option<String>,

    /// Rows shown per side until a client picks another depth
    pub default_depth: Depth,

    /// Records requested per side in each snapshot
    pub per_page: u32,

    /// IPC socket path for publishing book frames
    pub ipc_socket_path: String,

    /// Port of the health/metrics/book HTTP server
    pub http_port: u16,

    /// Full re-fetch interval while the socket is connected
    pub poll_interval_secs: u64,

    /// Reconnection settings
    pub reconnect_delay_ms: u64,

    /// Status log interval in seconds
    pub health_check_interval_secs: u64,
}

const DEFAULT_RELAYER_URL: &str = "http://localhost:3001/api/v3";
const DEFAULT_RELAYER_WS_URL: &str = "ws://localhost:3001";
const DEFAULT_MARKETS: &str = "ZRX-WETH";
const DEFAULT_TOKENS: &str = "ZRX:0xe41d2489571d322189246dafa5ebde1f4699f498:18,\
                              WETH:0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2:18";

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let tokens = parse_tokens(&var_or("TOKENS", DEFAULT_TOKENS))?;
        let markets = parse_markets(&var_or("MARKETS", DEFAULT_MARKETS), &tokens)?;

        let default_depth = match env::var("ORDERBOOK_DEPTH") {
            Ok(raw) => raw.parse::<Depth>()?,
            Err(_) => Depth::default(),
        };

        let account_address = env::var("ACCOUNT_ADDRESS")
            .ok()
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty());

        Ok(Self {
            markets,
            relayer_url: var_or("RELAYER_URL", DEFAULT_RELAYER_URL),
            relayer_ws_url: var_or("RELAYER_WS_URL", DEFAULT_RELAYER_WS_URL),
            account_address,
            default_depth,
            per_page: var_or("PER_PAGE", "100").parse().unwrap_or(100),
            ipc_socket_path: var_or("IPC_SOCKET_PATH", "/tmp/relayer-orderbook.sock"),
            http_port: var_or("HTTP_PORT", "9090").parse().unwrap_or(9090),
            poll_interval_secs: var_or("POLL_INTERVAL_SECS", "10").parse().unwrap_or(10),
            reconnect_delay_ms: var_or("RECONNECT_DELAY_MS", "3000").parse().unwrap_or(3000),
            health_check_interval_secs: var_or("HEALTH_CHECK_INTERVAL_SECS", "30")
                .parse()
                .unwrap_or(30),
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse `SYMBOL:address:decimals` entries, comma separated
fn parse_tokens(raw: &str) -> Result<HashMap<String, Token>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
            let [symbol, address, decimals] = parts[..] else {
                return Err(BookError::ConfigError(format!("Invalid token entry: {}", entry)));
            };
            let decimals: u32 = decimals.parse().map_err(|_| {
                BookError::ConfigError(format!("Invalid decimals for {}: {}", symbol, decimals))
            })?;
            if decimals > 28 {
                return Err(BookError::ConfigError(format!(
                    "Token {} has {} decimals, at most 28 are supported",
                    symbol, decimals
                )));
            }
            let token = Token::new(symbol, address, decimals);
            Ok((token.symbol.clone(), token))
        })
        .collect()
}

/// Parse `BASE-QUOTE[:basePrecision:pricePrecision]` entries, comma separated
fn parse_markets(raw: &str, tokens: &HashMap<String, Token>) -> Result<Vec<Market>> {
    let lookup = |symbol: &str| {
        tokens
            .get(symbol)
            .cloned()
            .ok_or_else(|| BookError::ConfigError(format!("Unknown token: {}", symbol)))
    };

    let markets: Vec<Market> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let mut parts = entry.split(':').map(str::trim);
            let pair: CurrencyPair = parts.next().unwrap_or_default().parse()?;

            let precision = match (parts.next(), parts.next()) {
                (None, _) => Precision::default(),
                (Some(base), Some(price)) => Precision {
                    base: base.parse().map_err(|_| {
                        BookError::ConfigError(format!("Invalid base precision in {}", entry))
                    })?,
                    price: price.parse().map_err(|_| {
                        BookError::ConfigError(format!("Invalid price precision in {}", entry))
                    })?,
                },
                (Some(_), None) => {
                    return Err(BookError::ConfigError(format!(
                        "Market {} needs both base and price precision",
                        entry
                    )))
                }
            };

            Ok(Market {
                base: lookup(&pair.base)?,
                quote: lookup(&pair.quote)?,
                pair,
                precision,
            })
        })
        .collect::<Result<_>>()?;

    if markets.is_empty() {
        return Err(BookError::ConfigError("No markets configured".to_string()));
    }

    Ok(markets)
}

impl Default for Config {
    fn default() -> Self {
        let markets = parse_tokens(DEFAULT_TOKENS)
            .and_then(|tokens| parse_markets(DEFAULT_MARKETS, &tokens))
            .unwrap_or_default();

        Self {
            markets,
            relayer_url: DEFAULT_RELAYER_URL.to_string(),
            relayer_ws_url: DEFAULT_RELAYER_WS_URL.to_string(),
            account_address: None,
            default_depth: Depth::default(),
            per_page: 100,
            ipc_socket_path: "/tmp/relayer-orderbook.sock".to_string(),
            http_port: 9090,
            poll_interval_secs: 10,
            reconnect_delay_ms: 3000,
            health_check_interval_secs: 30,
        }
    }
}
