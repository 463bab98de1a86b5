use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving a type name against the registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// A bare type name is not registered. This is a local registration bug,
    /// not a transient condition, and callers must not carry on.
    #[error("Unknown local type: {0}")]
    UnknownLocalType(String),

    /// A compound `origin:name` reference could not be resolved locally.
    /// The owning bundle may still be fetched.
    #[error("Type {name} is not known from {origin}")]
    UnknownRemoteType {
        /// The external source locator (e.g. `flame_graphics.dll`)
        origin: String,
        /// The type name inside that source
        name: String,
    },
}

impl TypeError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            TypeError::UnknownLocalType(_) => "ERR_TYPE_UNKNOWN_LOCAL",
            TypeError::UnknownRemoteType { .. } => "ERR_TYPE_UNKNOWN_REMOTE",
        }
    }

    /// Whether this error must abort node construction
    pub fn is_fatal(&self) -> bool {
        matches!(self, TypeError::UnknownLocalType(_))
    }
}

/// Errors raised while fetching a type bundle from a [`crate::BundleSource`]
#[derive(Error, Debug)]
pub enum FetchError {
    /// The HTTP client could not be built
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request did not complete
    #[error("Request for {url} failed: {source}")]
    Http {
        /// Requested URL
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("Request for {url} returned status {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Reading a bundle from disk failed
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The source has no bundle with this file name
    #[error("Type bundle {0} not found")]
    NotFound(String),

    /// The bundle was fetched but is not a valid bundle document
    #[error("Malformed type bundle {file}: {source}")]
    Malformed {
        /// Bundle file name
        file: String,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            FetchError::Client(_) => "ERR_FETCH_CLIENT",
            FetchError::Http { .. } => "ERR_FETCH_HTTP",
            FetchError::Status { .. } => "ERR_FETCH_STATUS",
            FetchError::Io { .. } => "ERR_FETCH_IO",
            FetchError::NotFound(_) => "ERR_FETCH_NOT_FOUND",
            FetchError::Malformed { .. } => "ERR_FETCH_MALFORMED",
        }
    }
}
