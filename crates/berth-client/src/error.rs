//! Error types for the lifecycle client.

use std::fmt;
use std::time::Duration;

use berth_core::{UnitName, ValidationError};
use thiserror::Error;

/// A specialized Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// The lifecycle operation an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create and start a unit.
    Add,
    /// Stop and remove a unit.
    Remove,
    /// List all units.
    List,
    /// Look up a single unit.
    Inspect,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::List => "list",
            Self::Inspect => "inspect",
        })
    }
}

/// How a transport-level failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The runtime refused or could not accept the connection.
    Connect,
    /// No response arrived within the transport's own timeout.
    Timeout,
    /// The request failed in flight, e.g. the connection closed before a
    /// response was received.
    Request,
    /// The request could not be built, e.g. the URL does not parse. Nothing
    /// was sent.
    Build,
}

/// The runtime could not be reached or did not answer.
///
/// This is distinct from the runtime answering with a failure status,
/// which is a [`ClientError::Runtime`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?} failure talking to runtime: {message}")]
pub struct TransportError {
    /// What went wrong.
    pub kind: TransportErrorKind,
    /// Underlying error text.
    pub message: String,
}

impl TransportError {
    /// Create a transport error.
    #[must_use]
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A connection-refused style failure.
    #[must_use]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_builder() {
            TransportErrorKind::Build
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_timeout() {
            TransportErrorKind::Timeout
        } else {
            TransportErrorKind::Request
        };
        Self::new(kind, err.to_string())
    }
}

/// Errors that can occur during lifecycle operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The descriptor was malformed. Raised before any request is sent.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The runtime was unreachable or did not answer.
    #[error("transport error: {0}")]
    Transport(TransportError),

    /// The runtime answered with a non-success status.
    #[error("runtime rejected {operation}: status {status}: {body}")]
    Runtime {
        /// The operation that was rejected.
        operation: Operation,
        /// HTTP-style status code returned by the runtime.
        status: u16,
        /// Response body, kept for diagnostics.
        body: String,
    },

    /// `add` found a unit with the same name already present.
    #[error("unit already exists: {0}")]
    AlreadyExists(UnitName),

    /// The runtime reported success but its response could not be decoded.
    #[error("malformed {operation} response from runtime: {message}")]
    MalformedResponse {
        /// The operation whose response was malformed.
        operation: Operation,
        /// Decoder error text.
        message: String,
    },

    /// A bounded wait ran out of time.
    #[error("timed out after {waited:?}; last observed: {last_observed}")]
    Timeout {
        /// How long the wait lasted.
        waited: Duration,
        /// The last thing observed before giving up.
        last_observed: String,
    },

    /// Client configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<TransportError> for ClientError {
    /// A request that could not be built is a configuration problem, not a
    /// failure to reach the runtime.
    fn from(err: TransportError) -> Self {
        match err.kind {
            TransportErrorKind::Build => {
                Self::Config(format!("invalid runtime request: {}", err.message))
            }
            _ => Self::Transport(err),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::from(err).into()
    }
}

impl ClientError {
    /// Check if this error might go away by retrying the same call.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if the runtime itself refused the request.
    #[must_use]
    pub const fn is_runtime_rejection(&self) -> bool {
        matches!(self, Self::Runtime { .. } | Self::AlreadyExists(_))
    }

    /// The runtime's status code, if this error carries one.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Runtime { status, .. } => Some(*status),
            _ => None,
        }
    }
}
