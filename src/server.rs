//! HTTP server for health checks, metrics and book queries

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::error::BookError;
use crate::orderbook::{
    BookAction, BookOption, BookStore, BookViewState, Depth, PriceSelection, RenderedBook, Side,
};
use crate::publisher::BookFrame;
use crate::AppState;

/// View change requested by a client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ViewCommand {
    SetDepth { depth: Depth },
    SetBookOption { option: BookOption },
    ClickRow { side: Side, index: usize },
    ClearSelection,
}

impl From<ViewCommand> for BookAction {
    fn from(command: ViewCommand) -> Self {
        match command {
            ViewCommand::SetDepth { depth } => BookAction::SetDepth(depth),
            ViewCommand::SetBookOption { option } => BookAction::SetBookOption(option),
            ViewCommand::ClickRow { side, index } => BookAction::ClickRow { side, index },
            ViewCommand::ClearSelection => BookAction::ClearSelection,
        }
    }
}

/// Rendered book plus the current selection
#[derive(Debug, Clone, Serialize)]
pub struct BookResponse {
    pub pair: String,
    pub book: RenderedBook,
    pub selection: Option<PriceSelection>,
}

impl BookResponse {
    fn of(state: &BookViewState) -> Self {
        Self {
            pair: state.market().key(),
            book: state.view().render(&state.market().precision),
            selection: state.selection(),
        }
    }
}

pub struct ApiError(BookError);

impl From<BookError> for ApiError {
    fn from(err: BookError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            BookError::UnknownMarket(_) => StatusCode::NOT_FOUND,
            BookError::InvalidDepth(_) | BookError::InvalidPair(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/markets", get(markets))
        .route("/book/:pair", get(book))
        .route("/book/:pair/actions", post(book_action))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.http_port));
    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let markets = state.store.read().await.pairs().len();
    Json(serde_json::json!({
        "status": "healthy",
        "component": "relayer-orderbook",
        "markets": markets,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, ApiError> {
    Ok(state.metrics.encode()?)
}

async fn markets(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.store.read().await.pairs())
}

async fn book(
    State(state): State<Arc<AppState>>,
    Path(pair): Path<String>,
) -> Result<Json<BookResponse>, ApiError> {
    Ok(Json(book_response(&state, &pair).await?))
}

async fn book_action(
    State(state): State<Arc<AppState>>,
    Path(pair): Path<String>,
    Json(command): Json<ViewCommand>,
) -> Result<Json<BookResponse>, ApiError> {
    // Frame and response come from the book the action was resolved against
    let (frame, response) = {
        let mut store = state.store.write().await;
        store.dispatch(&pair, command.into())?;
        let market = lookup(&store, &pair)?;
        (BookFrame::of(market), BookResponse::of(market))
    };

    state.publisher.publish(&frame).await?;
    Ok(Json(response))
}

async fn book_response(state: &AppState, pair: &str) -> Result<BookResponse, BookError> {
    let store = state.store.read().await;
    Ok(BookResponse::of(lookup(&store, pair)?))
}

fn lookup<'a>(store: &'a BookStore, pair: &str) -> Result<&'a BookViewState, BookError> {
    store
        .get(pair)
        .ok_or_else(|| BookError::UnknownMarket(pair.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::market::Precision;
    use crate::metrics::Metrics;
    use crate::orderbook::{OrderBook, OrderBookItem};
    use crate::publisher::Publisher;
    use rust_decimal_macros::dec;
    use tokio::io::AsyncReadExt;
    use tokio::net::UnixListener;

    async fn app_state(dir: &tempfile::TempDir) -> Arc<AppState> {
        let path = dir.path().join("book.sock");
        let publisher = Publisher::new(path.to_str().unwrap()).await.unwrap();
        let state = Arc::new(AppState::new(
            Arc::new(Config::default()),
            Arc::new(publisher),
            Arc::new(Metrics::new().unwrap()),
        ));
        state
            .store
            .write()
            .await
            .dispatch(
                "ZRX-WETH",
                BookAction::ReplaceBook(OrderBook {
                    buy_orders: vec![
                        OrderBookItem::new(Side::Buy, dec!(0.5), dec!(10)),
                        OrderBookItem::new(Side::Buy, dec!(0.4), dec!(5)),
                    ],
                    sell_orders: vec![OrderBookItem::new(Side::Sell, dec!(0.6), dec!(4))],
                    my_size_orders: vec![],
                }),
            )
            .unwrap();
        state
    }

    #[test]
    fn test_parse_commands() {
        let command: ViewCommand =
            serde_json::from_str(r#"{"action": "set_depth", "depth": 20}"#).unwrap();
        assert_eq!(command, ViewCommand::SetDepth { depth: Depth::Twenty });

        let command: ViewCommand =
            serde_json::from_str(r#"{"action": "click_row", "side": "buy", "index": 1}"#).unwrap();
        assert_eq!(
            BookAction::from(command),
            BookAction::ClickRow {
                side: Side::Buy,
                index: 1
            }
        );

        assert!(serde_json::from_str::<ViewCommand>(r#"{"action": "set_depth", "depth": 7}"#).is_err());
    }

    #[tokio::test]
    async fn test_book_action_click_returns_selection() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;

        let Json(response) = book_action(
            State(state.clone()),
            Path("zrx-weth".to_string()),
            Json(ViewCommand::ClickRow {
                side: Side::Buy,
                index: 1,
            }),
        )
        .await
        .map_err(|e| e.0)
        .unwrap();

        assert_eq!(response.pair, "ZRX-WETH");
        let selection = response.selection.unwrap();
        assert_eq!(selection.price, dec!(0.4));
        assert_eq!(selection.cumulative_size, dec!(15));
        assert_eq!(response.book.bids[0].price, "0.5000000");
    }

    #[tokio::test]
    async fn test_book_action_publishes_the_frame_it_answers_with() {
        let dir = tempfile::tempdir().unwrap();
        let listener = UnixListener::bind(dir.path().join("book.sock")).unwrap();
        let state = app_state(&dir).await;
        let (mut ui, _) = listener.accept().await.unwrap();

        let Json(response) = book_action(
            State(state.clone()),
            Path("ZRX-WETH".to_string()),
            Json(ViewCommand::ClickRow {
                side: Side::Buy,
                index: 0,
            }),
        )
        .await
        .map_err(|e| e.0)
        .unwrap();

        let mut len = [0u8; 4];
        ui.read_exact(&mut len).await.unwrap();
        let mut data = vec![0u8; u32::from_be_bytes(len) as usize];
        ui.read_exact(&mut data).await.unwrap();
        let frame: BookFrame = rmp_serde::from_slice(&data).unwrap();

        assert_eq!(frame.pair, response.pair);
        assert_eq!(frame.selection, response.selection);
        assert_eq!(frame.selection.unwrap().cumulative_size, dec!(10));
        assert_eq!(frame.view.render(&Precision::default()), response.book);
    }

    #[tokio::test]
    async fn test_unknown_market_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;

        let err = book(State(state), Path("MKR-DAI".to_string()))
            .await
            .err()
            .unwrap();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
