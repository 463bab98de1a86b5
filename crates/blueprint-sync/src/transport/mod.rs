//! Message transport between the session and the external process

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, instrument, warn};

use crate::error::TransportError;

#[cfg(any(test, feature = "test-utils"))]
mod memory;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::{MemoryConnector, MemoryPeer, MemoryServer};

/// A bidirectional text-message connection
#[async_trait]
pub trait Connection: Send {
    /// Next inbound text message; `None` once the peer has closed
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Send a text message
    async fn send(&mut self, text: String) -> Result<(), TransportError>;
}

/// Opens connections
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to `url`
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError>;
}

/// WebSocket transport
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    #[instrument(skip(self))]
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError> {
        let (stream, _) = connect_async(url).await.map_err(|e| TransportError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Box::new(WebSocketConnection { stream }))
    }
}

struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Peer closed the connection");
                    return None;
                }
                Ok(Message::Binary(data)) => {
                    warn!(bytes = data.len(), "Ignoring binary message");
                }
                // Ping and pong are answered by tungstenite
                Ok(_) => {}
                Err(err) => return Some(Err(err.into())),
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }
}
