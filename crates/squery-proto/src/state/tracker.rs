//! Session state machine core implementation.

use super::{SessionState, StateError};

/// Sans-IO tracker for login and context selection.
#[derive(Clone, Debug, Default)]
pub struct SessionMachine {
    state: SessionState,
    identity: Option<String>,
    context: Option<u64>,
    opened: bool,
}

impl SessionMachine {
    /// Create a machine in [`SessionState::Disconnected`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Login name accepted by the server, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Selected virtual server, if any.
    #[must_use]
    pub fn context(&self) -> Option<u64> {
        self.context
    }

    /// Whether the session reached its terminal state.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.opened && self.state == SessionState::Disconnected
    }

    /// Transport opened and greeting read. Ignored once the session terminated.
    pub fn opened(&mut self) {
        if !self.opened {
            self.opened = true;
            self.state = SessionState::Connected;
        }
    }

    /// Check that a command requiring `required` may be sent now.
    pub fn check(&self, required: SessionState) -> Result<(), StateError> {
        if self.state == SessionState::Disconnected {
            return Err(StateError::Closed);
        }
        if self.state < required {
            return Err(StateError::Precondition {
                required,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// The server accepted a login.
    ///
    /// Re-authenticating in a higher state keeps that state and its context.
    pub fn logged_in(&mut self, identity: impl Into<String>) {
        if self.state == SessionState::Disconnected {
            return;
        }
        self.identity = Some(identity.into());
        if self.state < SessionState::Authenticated {
            self.state = SessionState::Authenticated;
        }
    }

    /// The server accepted a logout. Identity and context are cleared.
    pub fn logged_out(&mut self) {
        if self.state == SessionState::Disconnected {
            return;
        }
        self.identity = None;
        self.context = None;
        self.state = SessionState::Connected;
    }

    /// The server accepted a context selection.
    pub fn context_selected(&mut self, id: u64) {
        if self.state < SessionState::Authenticated {
            return;
        }
        self.context = Some(id);
        self.state = SessionState::ContextSelected;
    }

    /// The session closed or its transport failed. Terminal.
    pub fn terminated(&mut self) {
        self.opened = true;
        self.state = SessionState::Disconnected;
        self.identity = None;
        self.context = None;
    }
}
