//! Relayer REST client

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::market::Market;
use crate::orderbook::OrderBook;
use crate::parser::{book_from_response, OrderbookResponse};

/// Source of full order book snapshots
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_book(&self, market: &Market) -> Result<OrderBook>;
}

/// HTTP client for the standard relayer API
pub struct RelayerClient {
    http: reqwest::Client,
    endpoint: String,
    per_page: u32,
    account: Option<String>,
}

impl RelayerClient {
    /// `account` selects the orders reported as the user's own
    pub fn new(endpoint: &str, per_page: u32, account: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            per_page,
            account,
        }
    }

    /// Fetch the raw order book of one market
    pub async fn fetch_orderbook(&self, market: &Market) -> Result<OrderbookResponse> {
        let url = format!("{}/orderbook", self.endpoint);
        debug!(pair = %market.pair, url = %url, "Fetching order book snapshot");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("baseAssetData", market.base.asset_data()),
                ("quoteAssetData", market.quote.asset_data()),
                ("perPage", self.per_page.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<OrderbookResponse>()
            .await?;

        Ok(response)
    }
}

#[async_trait]
impl SnapshotSource for RelayerClient {
    async fn fetch_book(&self, market: &Market) -> Result<OrderBook> {
        let response = self.fetch_orderbook(market).await?;
        Ok(book_from_response(market, &response, self.account.as_deref()))
    }
}
