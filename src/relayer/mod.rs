//! Relayer module: REST snapshots and WebSocket push

mod client;
mod manager;
mod rest;

pub use client::WebSocketClient;
pub use manager::{spawn_selection_logger, spawn_status_logger, BookRefresher, FeedManager};
pub use rest::{RelayerClient, SnapshotSource};

#[cfg(test)]
pub use rest::MockSnapshotSource;
