//! WebSocket client for the relayer order stream
//!
//! One socket, one `orders` subscription. Control frames are answered here
//! so callers only ever see text payloads.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use crate::error::{BookError, Result};
use crate::parser::SubscribeRequest;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Relayer socket subscribed to order updates
pub struct WebSocketClient {
    endpoint: String,
    stream: Option<WsStream>,
    request_id: Option<String>,
}

impl WebSocketClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            stream: None,
            request_id: None,
        }
    }

    /// Open the socket and subscribe to the `orders` channel.
    ///
    /// Any previous subscription is dropped first.
    pub async fn connect(&mut self) -> Result<()> {
        self.close().await;

        let (mut stream, response) = connect_async(self.endpoint.as_str())
            .await
            .map_err(|e| BookError::WebSocketConnection(format!("{}: {}", self.endpoint, e)))?;
        debug!(url = %self.endpoint, status = ?response.status(), "Relayer socket open");

        let request = SubscribeRequest::orders();
        stream
            .send(Message::Text(serde_json::to_string(&request)?))
            .await
            .map_err(|e| BookError::WebSocketMessage(format!("Subscribe failed: {}", e)))?;

        info!(url = %self.endpoint, request_id = %request.request_id, "Subscribed to relayer orders");
        self.stream = Some(stream);
        self.request_id = Some(request.request_id);
        Ok(())
    }

    /// Next text payload. `Ok(None)` means a control frame was handled.
    pub async fn recv(&mut self) -> Result<Option<String>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| BookError::WebSocketConnection("Not connected".to_string()))?;

        let next = stream.next().await;
        let message = match next {
            Some(Ok(message)) => message,
            Some(Err(e)) => return Err(self.drop_stream(BookError::WebSocketMessage(e.to_string()))),
            None => {
                return Err(self.drop_stream(BookError::WebSocketConnection(
                    "Stream ended".to_string(),
                )))
            }
        };

        match message {
            Message::Text(text) => Ok(Some(text)),
            Message::Binary(data) => String::from_utf8(data)
                .map(Some)
                .map_err(|e| BookError::ParseError(format!("Binary frame is not UTF-8: {}", e))),
            Message::Ping(payload) => {
                stream.send(Message::Pong(payload)).await.map_err(send_error)?;
                Ok(None)
            }
            Message::Pong(_) | Message::Frame(_) => Ok(None),
            Message::Close(frame) => Err(self.drop_stream(BookError::WebSocketConnection(
                format!("Closed by relayer: {:?}", frame),
            ))),
        }
    }

    /// Keepalive ping; a no-op while disconnected
    pub async fn ping(&mut self) -> Result<()> {
        match self.stream.as_mut() {
            Some(stream) => stream.send(Message::Ping(Vec::new())).await.map_err(send_error),
            None => Ok(()),
        }
    }

    /// Request id of the active subscription
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub async fn close(&mut self) {
        self.request_id = None;
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close(None).await {
                debug!(error = %e, "Relayer socket already gone");
            }
        }
    }

    fn drop_stream(&mut self, err: BookError) -> BookError {
        warn!(error = %err, "Relayer socket lost");
        self.stream = None;
        err
    }

    #[cfg(test)]
    pub(crate) fn subscribed(endpoint: &str, request_id: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            stream: None,
            request_id: Some(request_id.to_string()),
        }
    }
}

fn send_error(e: tungstenite::Error) -> BookError {
    BookError::WebSocketMessage(e.to_string())
}
