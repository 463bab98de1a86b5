use blueprint_core::EditorError;
use blueprint_types::FetchError;
use thiserror::Error;

/// Transport-level failures. All of them end the current connection.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The endpoint could not be reached
    #[error("Failed to connect to {url}: {reason}")]
    Connect {
        /// Endpoint URL
        url: String,
        /// Underlying failure
        reason: String,
    },

    /// An established connection failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The peer went away
    #[error("Connection closed")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error;
        match err {
            Error::ConnectionClosed | Error::AlreadyClosed => TransportError::Closed,
            other => TransportError::Connection(other.to_string()),
        }
    }
}

/// Session error types
#[derive(Error, Debug)]
pub enum SessionError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required bundle could not be loaded before connecting
    #[error("Preload failed: {0}")]
    Preload(#[from] FetchError),

    /// The editor rejected a snapshot
    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),

    /// An inbound message is not a valid snapshot
    #[error("Invalid message: {0}")]
    InvalidMessage(#[from] serde_json::Error),

    /// Transport failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The session is no longer running
    #[error("Session stopped")]
    Stopped,
}

impl SessionError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionError::Config(_) => "ERR_SESSION_CONFIG",
            SessionError::Preload(err) => err.error_code(),
            SessionError::Editor(err) => err.error_code(),
            SessionError::InvalidMessage(_) => "ERR_SESSION_INVALID_MESSAGE",
            SessionError::Transport(_) => "ERR_SESSION_TRANSPORT",
            SessionError::Stopped => "ERR_SESSION_STOPPED",
        }
    }

    /// Whether the session loop must stop
    pub fn is_fatal(&self) -> bool {
        match self {
            SessionError::Editor(err) => err.is_fatal(),
            SessionError::Config(_) | SessionError::Preload(_) | SessionError::Stopped => true,
            SessionError::InvalidMessage(_) | SessionError::Transport(_) => false,
        }
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
