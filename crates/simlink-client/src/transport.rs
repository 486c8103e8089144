//! Transport abstraction and the WebSocket implementation
//!
//! The client core is written against a minimal transport contract so tests
//! can inject a deterministic in-memory transport; production traffic runs
//! over WebSocket text frames.

use crate::ClientError;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

/// Factory for connections to the backend endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish a connection, completing the handshake.
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn TransportConn>, ClientError>;
}

/// A live connection handle.
///
/// The client keeps at most one of these alive at a time.
#[async_trait]
pub trait TransportConn: Send {
    /// Transmit one text frame.
    async fn send(&mut self, frame: String) -> Result<(), ClientError>;

    /// Receive the next text frame. `Ok(None)` means the peer closed cleanly.
    async fn recv(&mut self) -> Result<Option<String>, ClientError>;

    /// Close the connection. Best effort; failures are ignored.
    async fn close(&mut self);
}

/// Production transport: WebSocket via tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn TransportConn>, ClientError> {
        let (stream, _response) = connect_async(endpoint)
            .await
            .map_err(|e| ClientError::ConnectionFailed(e.to_string()))?;
        Ok(Box::new(WsConn { stream }))
    }
}

struct WsConn {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl TransportConn for WsConn {
    async fn send(&mut self, frame: String) -> Result<(), ClientError> {
        self.stream
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Option<String>, ClientError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // The protocol is text-only; ping/pong is answered inside
                // tungstenite and binary frames are skipped.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(ClientError::Transport(e.to_string())),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
