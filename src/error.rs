//! Unified error handling for sqadmin.
//!
//! Every layer below (codec, transport, session state machine, command
//! builder) has its own error type; [`AdminError`] folds them into the
//! taxonomy callers match on, with static labels for log correlation.

use squery_proto::{
    CommandBuildError, CommandError, ProtocolError, SessionState, StateError, TransportError,
};
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by sessions and the command façade.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The transport could not be established.
    #[error("cannot connect to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A response row did not fit the entity view. The session stays usable.
    #[error("unexpected row: {0}")]
    View(#[source] ProtocolError),

    /// Login rejected by the server.
    #[error("login rejected (id={id}): {message}")]
    Auth { id: u32, message: String },

    /// The session has not reached the state the command needs. Nothing was sent.
    #[error("command requires state {required}, session is {actual}")]
    Precondition {
        required: SessionState,
        actual: SessionState,
    },

    /// Caller-supplied arguments were rejected locally. Nothing was sent.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A well-formed command rejected by the server.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The session was closed or lost its connection.
    #[error("session is closed")]
    Closed,

    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AdminError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection_error",
            Self::Io(_) => "io_error",
            Self::ConnectionClosed => "connection_closed",
            Self::Timeout(_) => "timeout",
            Self::Protocol(_) => "protocol_error",
            Self::View(_) => "view_error",
            Self::Auth { .. } => "auth_error",
            Self::Precondition { .. } => "precondition_error",
            Self::Validation(_) => "validation_error",
            Self::Command(_) => "command_error",
            Self::Closed => "closed",
            Self::Unsupported(_) => "unsupported_operation",
            Self::Config(_) => "config_error",
        }
    }

    /// Raised locally without touching the transport.
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            Self::Precondition { .. } | Self::Validation(_) | Self::Unsupported(_) | Self::Config(_)
        )
    }

    /// Leaves the session unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::Io(_)
                | Self::ConnectionClosed
                | Self::Timeout(_)
                | Self::Protocol(_)
                | Self::Closed
        )
    }

    /// Server status id, for `Auth` and `Command` errors.
    pub fn status_id(&self) -> Option<u32> {
        match self {
            Self::Auth { id, .. } => Some(*id),
            Self::Command(err) => Some(err.id()),
            _ => None,
        }
    }
}

impl From<TransportError> for AdminError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connect { addr, source } => Self::Connection { addr, source },
            TransportError::Io(e) => Self::Io(e),
            TransportError::ConnectionClosed => Self::ConnectionClosed,
            TransportError::Timeout(after) => Self::Timeout(after),
            TransportError::Protocol(e) => Self::Protocol(e),
            TransportError::Closed => Self::Closed,
        }
    }
}

impl From<StateError> for AdminError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::Precondition { required, actual } => Self::Precondition { required, actual },
            StateError::Closed => Self::Closed,
        }
    }
}

impl From<CommandBuildError> for AdminError {
    fn from(err: CommandBuildError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type for sessions and the command façade.
pub type AdminResult<T> = Result<T, AdminError>;
