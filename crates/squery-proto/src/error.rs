//! Error types for the query protocol library.
//!
//! This module defines error types for framing failures, malformed responses,
//! command construction and server-side command rejections.

use thiserror::Error;

use crate::codec::{Row, Status};

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Extract the leading token of a raw line (for error reporting).
///
/// Works on raw bytes so the verb of a line can still be reported when the
/// rest of the line is not valid UTF-8.
pub(crate) fn extract_verb_hint(raw_line: &[u8]) -> Option<String> {
    let end = raw_line
        .iter()
        .position(|b| !b.is_ascii_alphanumeric() && *b != b'_')
        .unwrap_or(raw_line.len());

    if end == 0 {
        return None;
    }
    String::from_utf8(raw_line[..end].to_vec()).ok()
}

/// Errors raised while framing or decoding protocol lines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProtocolError {
    /// Invalid UTF-8 bytes in a received line.
    #[error("invalid UTF-8 in line at byte {byte_pos}: {details}")]
    InvalidUtf8 {
        /// The raw line as bytes (before UTF-8 validation failed).
        raw_line: Vec<u8>,
        /// Byte position where UTF-8 validation failed.
        byte_pos: usize,
        /// Detailed error message from the UTF-8 decoder.
        details: String,
        /// Leading token of the raw line, if it could be extracted.
        verb_hint: Option<String>,
    },

    /// A line exceeded the maximum allowed length.
    #[error("line too long: {actual} bytes (limit: {limit})")]
    LineTooLong {
        /// Actual line length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// The terminal status line could not be parsed.
    #[error("malformed status line {line:?}: {reason}")]
    MalformedStatus {
        /// The offending line.
        line: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A command line could not be decoded.
    #[error("malformed command line {line:?}: {reason}")]
    MalformedCommand {
        /// The offending line.
        line: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The server greeting did not start with the expected banner.
    #[error("unexpected greeting: expected {expected:?}, got {actual:?}")]
    UnexpectedBanner {
        /// Configured banner.
        expected: String,
        /// First line actually received.
        actual: String,
    },

    /// A response row lacks a field required by an entity view.
    #[error("missing field: {field}")]
    MissingField {
        /// Field name.
        field: String,
    },

    /// A response field could not be converted to the requested type.
    #[error("invalid value {value:?} for field {field}: expected {expected}")]
    InvalidField {
        /// Field name.
        field: String,
        /// Raw (unescaped) value.
        value: String,
        /// Expected kind of value.
        expected: &'static str,
    },
}

/// Errors returned when a [`Command`](crate::Command) cannot be built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CommandBuildError {
    /// The verb was empty.
    #[error("empty verb")]
    EmptyVerb,

    /// The verb contains characters outside `[A-Za-z0-9_]`.
    #[error("invalid verb: {0:?}")]
    InvalidVerb(String),

    /// A parameter key contains characters outside `[A-Za-z0-9_]`.
    #[error("invalid parameter key: {0:?}")]
    InvalidKey(String),

    /// A bare flag is empty or contains reserved characters.
    #[error("invalid flag: {0:?}")]
    InvalidFlag(String),

    /// A list-valued parameter had no items.
    #[error("empty list for parameter {0:?}")]
    EmptyList(String),

    /// The same parameter key was given twice.
    #[error("duplicate parameter key: {0:?}")]
    DuplicateKey(String),
}

/// A well-formed command rejected by the server.
///
/// Rows received before the failing status line are preserved so callers
/// can decide whether partial results are usable.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("command rejected (id={}): {}", .status.id, .status.message)]
pub struct CommandError {
    /// The failure status.
    pub status: Status,
    /// Rows decoded before the status line.
    pub rows: Vec<Row>,
}

impl CommandError {
    /// Numeric status id reported by the server.
    pub fn id(&self) -> u32 {
        self.status.id
    }

    /// Human-readable message reported by the server.
    pub fn message(&self) -> &str {
        &self.status.message
    }
}
