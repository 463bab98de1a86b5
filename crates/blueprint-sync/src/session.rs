//! The synchronization session
//!
//! One task drives the connection lifecycle
//! (`Disconnected -> Connecting -> Connected -> Disconnected`, forever),
//! applies inbound snapshots to the shared [`Editor`], runs the type bundle
//! fetches the editor asks for and serves host commands. Reconnection uses a
//! fixed delay with no retry limit.

use std::sync::Arc;
use std::time::Duration;

use blueprint_core::{Editor, EditorError, NodeId, NodeSpec};
use blueprint_types::{BundleSource, FetchError, TypeBundle};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tracing::{debug, error, info, instrument, warn};

use crate::config::SyncConfig;
use crate::error::{SessionError, SessionResult, TransportError};
use crate::message::{SaveMessage, Snapshot};
use crate::transport::{Connection, Connector};

/// The editor shared between the session and the host UI.
///
/// Nodes with a compound type need a bundle fetch that only the session can
/// run, so the host creates nodes through [`SessionHandle::create_node`].
pub type SharedEditor = Arc<Mutex<Editor>>;

type FetchFuture = BoxFuture<'static, (String, Result<TypeBundle, FetchError>)>;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection; waiting out the reconnect delay
    Disconnected,
    /// A connection attempt is in progress
    Connecting,
    /// Snapshots are being received
    Connected,
}

#[derive(Debug)]
enum SessionCommand {
    Save,
    CreateNode {
        spec: NodeSpec,
        reply: oneshot::Sender<Result<NodeId, EditorError>>,
    },
    Shutdown,
}

enum Flow {
    Continue,
    Stop,
}

/// Cloneable handle for controlling a running [`Session`]
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    state: watch::Receiver<ConnectionState>,
}

impl SessionHandle {
    /// Ask the session to send the current graph. Returns false once the
    /// session has stopped.
    pub fn save(&self) -> bool {
        self.commands.send(SessionCommand::Save).is_ok()
    }

    /// Create a node in the session's editor, starting the bundle fetch its
    /// type needs. Works in every connection state.
    pub async fn create_node(&self, spec: NodeSpec) -> SessionResult<NodeId> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(SessionCommand::CreateNode { spec, reply })
            .map_err(|_| SessionError::Stopped)?;

        let id = response.await.map_err(|_| SessionError::Stopped)??;
        Ok(id)
    }

    /// Ask the session to stop
    pub fn shutdown(&self) -> bool {
        self.commands.send(SessionCommand::Shutdown).is_ok()
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Subscribe to connection state changes
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

/// Synchronization session
pub struct Session {
    url: String,
    reconnect_delay: Duration,
    editor: SharedEditor,
    connector: Arc<dyn Connector>,
    source: Arc<dyn BundleSource>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    state: watch::Sender<ConnectionState>,
    fetches: FuturesUnordered<FetchFuture>,
}

impl Session {
    /// Create a session and its control handle
    pub fn new(
        config: &SyncConfig,
        editor: SharedEditor,
        connector: Arc<dyn Connector>,
        source: Arc<dyn BundleSource>,
    ) -> (Self, SessionHandle) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let session = Self {
            url: config.server_url.clone(),
            reconnect_delay: config.reconnect_delay(),
            editor,
            connector,
            source,
            commands: commands_rx,
            state: state_tx,
            fetches: FuturesUnordered::new(),
        };

        let handle = SessionHandle {
            commands: commands_tx,
            state: state_rx,
        };

        (session, handle)
    }

    /// Run until shut down or until a snapshot hits a fatal error
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn run(mut self) -> SessionResult<()> {
        info!("Starting synchronization session");

        loop {
            self.set_state(ConnectionState::Connecting);

            match self.connect().await {
                None => break,
                Some(Err(err)) => {
                    warn!(error = %err, "Connection attempt failed");
                }
                Some(Ok(connection)) => {
                    self.set_state(ConnectionState::Connected);
                    info!("Connected");

                    match self.drive(connection).await {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Stop) => break,
                        Err(err) => {
                            self.set_state(ConnectionState::Disconnected);
                            error!(error = %err, code = err.error_code(), "Session aborted");
                            return Err(err);
                        }
                    }
                }
            }

            self.set_state(ConnectionState::Disconnected);
            info!(delay_ms = self.reconnect_delay.as_millis() as u64, "Reconnecting after delay");

            if let Flow::Stop = self.wait(self.reconnect_delay).await {
                break;
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!("Session stopped");
        Ok(())
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    /// Attempt one connection. `None` means a shutdown was requested meanwhile.
    async fn connect(&mut self) -> Option<Result<Box<dyn Connection>, TransportError>> {
        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        let attempt = connector.connect(&url);
        tokio::pin!(attempt);

        loop {
            tokio::select! {
                result = &mut attempt => return Some(result),
                Some((file, result)) = self.fetches.next(), if !self.fetches.is_empty() => {
                    self.finish_fetch(file, result).await;
                }
                command = self.commands.recv() => {
                    if let Flow::Stop = self.offline_command(command).await {
                        return None;
                    }
                }
            }
        }
    }

    async fn drive(&mut self, mut connection: Box<dyn Connection>) -> SessionResult<Flow> {
        loop {
            tokio::select! {
                message = connection.recv() => match message {
                    Some(Ok(text)) => self.apply_snapshot(&text).await?,
                    Some(Err(err)) => {
                        warn!(error = %err, "Connection lost");
                        return Ok(Flow::Continue);
                    }
                    None => {
                        info!("Connection closed by peer");
                        return Ok(Flow::Continue);
                    }
                },
                Some((file, result)) = self.fetches.next(), if !self.fetches.is_empty() => {
                    self.finish_fetch(file, result).await;
                }
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Save) => {
                        if let Err(err) = self.save(connection.as_mut()).await {
                            warn!(error = %err, "Save failed");
                            return Ok(Flow::Continue);
                        }
                    }
                    Some(SessionCommand::CreateNode { spec, reply }) => self.create_node(spec, reply).await,
                    Some(SessionCommand::Shutdown) | None => return Ok(Flow::Stop),
                },
            }
        }
    }

    async fn wait(&mut self, delay: Duration) -> Flow {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return Flow::Continue,
                Some((file, result)) = self.fetches.next(), if !self.fetches.is_empty() => {
                    self.finish_fetch(file, result).await;
                }
                command = self.commands.recv() => {
                    if let Flow::Stop = self.offline_command(command).await {
                        return Flow::Stop;
                    }
                }
            }
        }
    }

    /// Apply an inbound snapshot. Structurally invalid messages are ignored.
    async fn apply_snapshot(&mut self, text: &str) -> SessionResult<()> {
        let snapshot = match Snapshot::parse(text).map_err(SessionError::from) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, code = err.error_code(), "Ignoring invalid snapshot");
                return Ok(());
            }
        };

        let (nodes, links) = snapshot.into_parts();
        let fetches = {
            let mut editor = self.editor.lock().await;
            editor.load_snapshot(nodes, links)?
        };

        for file in fetches {
            self.start_fetch(file);
        }
        Ok(())
    }

    fn start_fetch(&mut self, file: String) {
        debug!(bundle = %file, "Fetching type bundle");
        let source = Arc::clone(&self.source);
        self.fetches.push(Box::pin(async move {
            let result = source.fetch(&file).await;
            (file, result)
        }));
    }

    async fn finish_fetch(&mut self, file: String, result: Result<TypeBundle, FetchError>) {
        let mut editor = self.editor.lock().await;
        let ready = editor.complete_fetch(&file, result);
        debug!(bundle = %file, ready = ready.len(), pending_links = editor.pending_links(), "Type bundle fetch settled");
    }

    async fn create_node(&mut self, spec: NodeSpec, reply: oneshot::Sender<Result<NodeId, EditorError>>) {
        let result = {
            let mut editor = self.editor.lock().await;
            editor.create_node(spec)
        };

        let result = match result {
            Ok((id, fetch)) => {
                if let Some(file) = fetch {
                    self.start_fetch(file);
                }
                Ok(id)
            }
            Err(err) => {
                warn!(error = %err, code = err.error_code(), "Rejected node creation");
                Err(err)
            }
        };

        // The host may have stopped waiting
        let _ = reply.send(result);
    }

    async fn offline_command(&mut self, command: Option<SessionCommand>) -> Flow {
        match command {
            Some(SessionCommand::Save) => {
                warn!("Not connected; dropping save request");
                Flow::Continue
            }
            Some(SessionCommand::CreateNode { spec, reply }) => {
                self.create_node(spec, reply).await;
                Flow::Continue
            }
            Some(SessionCommand::Shutdown) | None => Flow::Stop,
        }
    }

    async fn save(&mut self, connection: &mut dyn Connection) -> SessionResult<()> {
        let message = {
            let editor = self.editor.lock().await;
            SaveMessage::from_graph(editor.graph())
        };

        connection.send(message.to_json()?).await?;
        info!(nodes = message.nodes.len(), "Saved graph");
        Ok(())
    }
}
