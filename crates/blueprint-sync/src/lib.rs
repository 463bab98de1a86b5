//!
//! Blueprint Sync - keeps the editor graph in step with an external process
//!
//! The session connects over WebSocket, replaces the graph on every inbound
//! snapshot, fetches type bundles for nodes whose types are not loaded yet,
//! sends Save messages on request and reconnects after a fixed delay whenever
//! the connection is lost.

#![forbid(unsafe_code)]

use std::sync::Arc;

use blueprint_core::Editor;
use blueprint_types::preload;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Configuration loading
pub mod config;

/// Error types
pub mod error;

/// Logging setup
pub mod logging;

/// Wire messages
pub mod message;

/// The session loop
pub mod session;

/// Headless rendering surface
pub mod surface;

/// Connection transports
pub mod transport;

pub use config::SyncConfig;
pub use error::{SessionError, SessionResult, TransportError};
pub use message::{LinkEntry, SaveMessage, SavedNode, Snapshot, SnapshotNode};
pub use session::{ConnectionState, Session, SessionHandle, SharedEditor};
pub use surface::TracingSurface;
pub use transport::{Connection, Connector, WebSocketConnector};

#[cfg(any(test, feature = "test-utils"))]
pub use transport::{MemoryConnector, MemoryPeer, MemoryServer};

/// Preload the required bundles, then run a WebSocket session until Ctrl-C
/// or a fatal error
pub async fn run(config: SyncConfig) -> SessionResult<()> {
    let source = config.bundle_source()?;
    let registry = preload(source.as_ref(), &config.preload_bundles).await?;

    let editor = Editor::new(registry).with_surface(Box::new(TracingSurface::new()));
    let editor: SharedEditor = Arc::new(Mutex::new(editor));

    let (session, handle) = Session::new(&config, editor, Arc::new(WebSocketConnector), source);

    let signal_handle = handle.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                signal_handle.shutdown();
            }
            Err(err) => warn!(error = %err, "Failed to listen for Ctrl-C"),
        }
    });

    let result = session.run().await;
    drop(handle);
    result
}
