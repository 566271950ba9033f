//! Transport error types.

use std::time::Duration;

use thiserror::Error;

use crate::error::ProtocolError;

/// Errors raised by a [`Connection`](super::Connection).
///
/// Every variant except [`TransportError::Closed`] leaves the connection
/// broken; the caller must close it and open a new one.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport could not be established (DNS, refused, connect timeout).
    #[error("cannot connect to {addr}: {source}")]
    Connect {
        /// Target address as given by the caller.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred on an established transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// No complete line arrived within the read timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The peer sent something that cannot be framed or decoded.
    #[error("transport protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The connection was closed locally or is broken by an earlier failure.
    #[error("connection is closed")]
    Closed,
}

impl TransportError {
    /// Whether this error came from establishing the transport.
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }
}
