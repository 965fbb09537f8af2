/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session status state machine.
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> LoggedIn
//!       ^             |             |           |
//!       +-------------+-------------+-----------+
//! ```
//!
//! Status is observable at runtime, so transitions are checked when they
//! happen instead of being encoded in types.

use fixgate_core::error::SessionError;
use fixgate_core::types::Timestamp;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection status of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// No transport.
    #[default]
    Disconnected,
    /// Transport being established.
    Connecting,
    /// Transport up, Logon not yet acknowledged.
    Connected,
    /// Logon acknowledged; application traffic allowed.
    LoggedIn,
}

impl SessionStatus {
    /// Returns true if moving from `self` to `next` is a legal transition.
    ///
    /// Moving to `Disconnected` is always legal.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (_, Self::Disconnected)
                | (Self::Disconnected, Self::Connecting)
                | (Self::Connecting, Self::Connected)
                | (Self::Connected, Self::LoggedIn)
        )
    }

    /// Returns the status name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::LoggedIn => "LoggedIn",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct Inner {
    status: SessionStatus,
    connected_since: Option<Timestamp>,
}

/// Thread-safe holder of a session's status.
#[derive(Debug, Default)]
pub struct StatusTracker {
    inner: RwLock<Inner>,
}

impl StatusTracker {
    /// Creates a tracker in `Disconnected`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current status.
    #[must_use]
    pub fn get(&self) -> SessionStatus {
        self.inner.read().status
    }

    /// Returns when the session last reached `Connected`, if it is still up.
    #[must_use]
    pub fn connected_since(&self) -> Option<Timestamp> {
        self.inner.read().connected_since
    }

    /// Moves to `next`.
    ///
    /// # Errors
    /// `InvalidState` if the transition is not legal from the current status.
    pub fn transition(&self, next: SessionStatus) -> Result<SessionStatus, SessionError> {
        let mut inner = self.inner.write();
        let previous = inner.status;
        if !previous.can_transition_to(next) {
            return Err(SessionError::InvalidState {
                expected: expected_before(next).to_string(),
                current: previous.to_string(),
            });
        }
        inner.status = next;
        match next {
            SessionStatus::Connected => inner.connected_since = Some(Timestamp::now()),
            SessionStatus::Disconnected => inner.connected_since = None,
            _ => {}
        }
        Ok(previous)
    }

    /// Moves to `Disconnected` and returns the previous status.
    pub fn disconnect(&self) -> SessionStatus {
        let mut inner = self.inner.write();
        inner.connected_since = None;
        std::mem::replace(&mut inner.status, SessionStatus::Disconnected)
    }

    /// Returns an error unless the session is logged in.
    ///
    /// # Errors
    /// `NotLoggedIn` naming `session_id`.
    pub fn require_logged_in(&self, session_id: &str) -> Result<(), SessionError> {
        if self.get() == SessionStatus::LoggedIn {
            Ok(())
        } else {
            Err(SessionError::NotLoggedIn {
                session_id: session_id.to_string(),
            })
        }
    }
}

fn expected_before(next: SessionStatus) -> &'static str {
    match next {
        SessionStatus::Connecting => "Disconnected",
        SessionStatus::Connected => "Connecting",
        SessionStatus::LoggedIn => "Connected",
        SessionStatus::Disconnected => "any",
    }
}
