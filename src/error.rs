//! Error types for the order book service

use thiserror::Error;

/// Order book service errors
#[derive(Error, Debug)]
pub enum BookError {
    #[error("WebSocket connection error: {0}")]
    WebSocketConnection(String),

    #[error("WebSocket message error: {0}")]
    WebSocketMessage(String),

    #[error("Failed to parse message: {0}")]
    ParseError(String),

    #[error("REST API error: {0}")]
    RestApiError(String),

    #[error("IPC error: {0}")]
    IpcError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Metrics error: {0}")]
    MetricsError(String),

    #[error("Invalid depth {0}, expected one of 5, 10, 20, 50")]
    InvalidDepth(usize),

    #[error("Invalid currency pair: {0}")]
    InvalidPair(String),

    #[error("Unknown market: {0}")]
    UnknownMarket(String),

    #[error("Connection timeout")]
    ConnectionTimeout,
}

impl From<tokio_tungstenite::tungstenite::Error> for BookError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        BookError::WebSocketConnection(err.to_string())
    }
}

impl From<serde_json::Error> for BookError {
    fn from(err: serde_json::Error) -> Self {
        BookError::ParseError(err.to_string())
    }
}

impl From<reqwest::Error> for BookError {
    fn from(err: reqwest::Error) -> Self {
        BookError::RestApiError(err.to_string())
    }
}

impl From<std::io::Error> for BookError {
    fn from(err: std::io::Error) -> Self {
        BookError::IpcError(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for BookError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        BookError::SerializationError(err.to_string())
    }
}

impl From<prometheus::Error> for BookError {
    fn from(err: prometheus::Error) -> Self {
        BookError::MetricsError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BookError>;
