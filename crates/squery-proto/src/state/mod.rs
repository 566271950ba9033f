//! Sans-IO session state machine.
//!
//! Tracks login identity and the selected virtual server of one connection
//! and decides whether a command may be sent. It performs no I/O: callers
//! report outcomes (`logged_in`, `context_selected`, ...) after the server
//! has answered.
//!
//! # Example
//!
//! ```
//! use squery_proto::state::{SessionMachine, SessionState};
//!
//! let mut machine = SessionMachine::new();
//! machine.opened();
//! assert!(machine.check(SessionState::ContextSelected).is_err());
//!
//! machine.logged_in("serveradmin");
//! machine.context_selected(1);
//! assert!(machine.check(SessionState::ContextSelected).is_ok());
//! ```

mod tracker;

pub use tracker::SessionMachine;

use std::fmt;

use thiserror::Error;

/// Lifecycle of a query session, ordered from least to most capable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionState {
    /// No usable connection. Terminal once a session has been opened.
    #[default]
    Disconnected,
    /// Transport open and greeting received.
    Connected,
    /// Login accepted.
    Authenticated,
    /// A virtual server is selected.
    ContextSelected,
}

impl SessionState {
    /// Lower-case name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Authenticated => "authenticated",
            Self::ContextSelected => "context_selected",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a command may not be sent in the current state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// The session has not reached the state the command requires.
    #[error("command requires state {required}, session is {actual}")]
    Precondition {
        /// State the command needs.
        required: SessionState,
        /// Current state.
        actual: SessionState,
    },

    /// The session was closed or lost its connection.
    #[error("session is closed")]
    Closed,
}
