//! Publisher module for IPC communication
//!
//! Pushes book frames to the UI process over a Unix socket.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{BookError, Result};
use crate::orderbook::{BookView, BookViewState, PriceSelection};

/// One market's view and selection, as sent to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookFrame {
    pub pair: String,
    pub view: BookView,
    pub selection: Option<PriceSelection>,
}

impl BookFrame {
    pub fn of(state: &BookViewState) -> Self {
        Self {
            pair: state.market().key(),
            view: state.view(),
            selection: state.selection(),
        }
    }
}

/// Encode a frame as a 4-byte big-endian length followed by MessagePack
pub fn encode_frame(frame: &BookFrame) -> Result<Vec<u8>> {
    let data = rmp_serde::to_vec_named(frame)?;

    let len = u32::try_from(data.len())
        .map_err(|_| BookError::SerializationError("Frame too large".to_string()))?
        .to_be_bytes();
    let mut message = Vec::with_capacity(4 + data.len());
    message.extend_from_slice(&len);
    message.extend_from_slice(&data);
    Ok(message)
}

/// Publisher for sending book frames via Unix socket
pub struct Publisher {
    socket_path: String,
    stream: Mutex<Option<UnixStream>>,
}

impl Publisher {
    /// Create a new publisher
    pub async fn new(socket_path: &str) -> Result<Self> {
        let publisher = Self {
            socket_path: socket_path.to_string(),
            stream: Mutex::new(None),
        };

        // The UI may start after us
        if let Err(e) = publisher.connect().await {
            warn!(error = %e, "Initial IPC connection failed, will retry on publish");
        }

        Ok(publisher)
    }

    /// Connect to the Unix socket
    async fn connect(&self) -> Result<()> {
        let path = Path::new(&self.socket_path);

        if !path.exists() {
            return Err(BookError::IpcError(format!(
                "Socket path does not exist: {}",
                self.socket_path
            )));
        }

        let stream = UnixStream::connect(path).await.map_err(|e| {
            BookError::IpcError(format!("Failed to connect to {}: {}", self.socket_path, e))
        })?;

        let mut guard = self.stream.lock().await;
        *guard = Some(stream);

        info!(path = %self.socket_path, "Connected to IPC socket");
        Ok(())
    }

    /// Publish a book frame. Delivery failures are logged, never returned.
    pub async fn publish(&self, frame: &BookFrame) -> Result<()> {
        let message = encode_frame(frame)?;

        let mut guard = self.stream.lock().await;

        if guard.is_none() {
            drop(guard);
            if let Err(e) = self.connect().await {
                debug!(error = %e, "Failed to reconnect to IPC socket");
                return Ok(());
            }
            guard = self.stream.lock().await;
        }

        if let Some(stream) = guard.as_mut() {
            match stream.write_all(&message).await {
                Ok(_) => {
                    debug!(pair = %frame.pair, bytes = message.len(), "Published book frame");
                }
                Err(e) => {
                    warn!(error = %e, "Failed to write to IPC socket");
                    *guard = None;
                }
            }
        }

        Ok(())
    }
}
