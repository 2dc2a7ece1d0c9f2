//! Failures that end a session or prevent one from starting.
//!
//! Participant-local problems (a malformed control line, a dropped observer)
//! never show up here; they are logged and absorbed where they happen.

use shared::Role;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to bootstrap {role} controller: {source}")]
    Bootstrap {
        role: Role,
        #[source]
        source: io::Error,
    },

    #[error("lost {role} controller: {source}")]
    ControllerSend {
        role: Role,
        #[source]
        source: io::Error,
    },

    #[error("shutdown requested")]
    Shutdown,
}

impl SessionError {
    /// The controller whose failure ended the session, if any.
    pub fn role(&self) -> Option<Role> {
        match self {
            SessionError::Bind { .. } | SessionError::Shutdown => None,
            SessionError::Bootstrap { role, .. } | SessionError::ControllerSend { role, .. } => {
                Some(*role)
            }
        }
    }
}
