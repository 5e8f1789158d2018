//! Protocol errors
//!
//! Reply errors are written back to the client as `<KIND> <message>\r\n`
//! and leave the connection usable. The remaining variants end the session.

use crate::queue::QueueError;
use strum_macros::Display;

/// Reply prefix of an error line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    #[strum(serialize = "ERROR")]
    Error,
    #[strum(serialize = "CLIENT_ERROR")]
    ClientError,
    #[strum(serialize = "SERVER_ERROR")]
    ServerError,
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("{kind} {message}")]
    Reply { kind: ErrorKind, message: String },

    #[error("client quit")]
    ClientQuit,

    #[error("client disconnected")]
    Disconnected,

    #[error("connection IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ControllerError {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Reply {
            kind: ErrorKind::Error,
            message: message.into(),
        }
    }

    pub fn client(message: impl Into<String>) -> Self {
        Self::Reply {
            kind: ErrorKind::ClientError,
            message: message.into(),
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::Reply {
            kind: ErrorKind::ServerError,
            message: message.into(),
        }
    }

    pub fn unknown_command() -> Self {
        Self::error("Unknown command")
    }

    pub fn invalid_command() -> Self {
        Self::error("Invalid command")
    }

    /// Errors after which the connection must be closed
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Reply { .. })
    }

    /// The line sent to the client, without the trailing CRLF
    pub fn reply_line(&self) -> Option<String> {
        match self {
            Self::Reply { .. } => Some(self.to_string()),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Reply { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<QueueError> for ControllerError {
    fn from(err: QueueError) -> Self {
        if err.is_invalid_name() {
            Self::client(err.to_string())
        } else {
            Self::server(err.to_string())
        }
    }
}

pub type ControllerResult<T> = Result<T, ControllerError>;
