//! In-process transport for tests, enabled by the `test-utils` feature

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Connection, Connector};
use crate::error::TransportError;

/// In-process transport, paired with a [`MemoryServer`]
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    accepted: mpsc::UnboundedSender<MemoryPeer>,
    refuse: Arc<AtomicBool>,
}

/// The accepting side of a [`MemoryConnector`]
#[derive(Debug)]
pub struct MemoryServer {
    accepted: mpsc::UnboundedReceiver<MemoryPeer>,
    refuse: Arc<AtomicBool>,
}

/// The server end of one in-process connection. Dropping it closes the
/// connection.
#[derive(Debug)]
pub struct MemoryPeer {
    url: String,
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl MemoryConnector {
    /// Create a connector and the server that accepts its connections
    pub fn new() -> (Self, MemoryServer) {
        let (tx, rx) = mpsc::unbounded_channel();
        let refuse = Arc::new(AtomicBool::new(false));
        (
            Self {
                accepted: tx,
                refuse: Arc::clone(&refuse),
            },
            MemoryServer { accepted: rx, refuse },
        )
    }
}

impl MemoryServer {
    /// Wait for the next connection
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accepted.recv().await
    }

    /// Make connection attempts fail, or succeed again
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

impl MemoryPeer {
    /// URL the client connected to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Push a text message to the client
    pub fn send(&self, text: impl Into<String>) -> bool {
        self.to_client.send(text.into()).is_ok()
    }

    /// Next message from the client; `None` once it has disconnected
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }
}

struct MemoryConnection {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError> {
        let refused = || TransportError::Connect {
            url: url.to_string(),
            reason: "connection refused".to_string(),
        };

        if self.refuse.load(Ordering::SeqCst) {
            return Err(refused());
        }

        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        let peer = MemoryPeer {
            url: url.to_string(),
            to_client,
            from_client,
        };

        self.accepted.send(peer).map_err(|_| refused())?;
        Ok(Box::new(MemoryConnection { inbound, outbound }))
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.outbound.send(text).map_err(|_| TransportError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_round_trip() {
        let (connector, mut server) = MemoryConnector::new();
        let mut connection = connector.connect("mem://editor").await.unwrap();
        let mut peer = server.accept().await.unwrap();

        assert_eq!(peer.url(), "mem://editor");
        assert!(peer.send("hello"));
        assert_eq!(connection.recv().await.unwrap().unwrap(), "hello");

        connection.send("world".to_string()).await.unwrap();
        assert_eq!(peer.recv().await.unwrap(), "world");

        drop(peer);
        assert!(connection.recv().await.is_none());
        assert!(matches!(
            connection.send("late".to_string()).await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_memory_refuse() {
        let (connector, server) = MemoryConnector::new();
        server.refuse_connections(true);

        let err = connector.connect("mem://editor").await.err().unwrap();
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
