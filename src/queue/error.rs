//! Queue Error Types

use crate::core::error_handling::ContextualError;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue: is empty")]
    Empty,

    #[error("queue: id {id} is out of bounds")]
    OutOfBounds { id: u64 },

    #[error("queue: name '{name}' is not alphanumeric")]
    InvalidName { name: String },

    #[error("queue: name is too long ({len} > {max} characters)")]
    NameTooLong { len: usize, max: usize },

    #[error("queue: head can not be less than zero")]
    InvalidHeadValue,

    #[error("queue: '{name}' shares its store and can not be flushed")]
    SharedFlush { name: String },

    #[error("queue: '{name}' is closed")]
    Closed { name: String },

    #[error("queue: corrupt key in store: {message}")]
    CorruptKey { message: String },

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("{message}")]
    Poisoned { message: String },
}

impl QueueError {
    /// True for the "nothing to read" outcome, which callers treat as data, not failure
    pub fn is_empty(&self) -> bool {
        matches!(self, QueueError::Empty)
    }

    /// True when a client-supplied name was rejected
    pub fn is_invalid_name(&self) -> bool {
        matches!(
            self,
            QueueError::InvalidName { .. } | QueueError::NameTooLong { .. }
        )
    }
}

impl From<std::io::Error> for QueueError {
    fn from(err: std::io::Error) -> Self {
        QueueError::Io {
            message: err.to_string(),
        }
    }
}

impl ContextualError for QueueError {
    fn is_user_actionable(&self) -> bool {
        self.is_invalid_name()
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            QueueError::InvalidName { .. } => {
                Some("queue names may only contain letters, digits, '_' and '-'")
            }
            QueueError::NameTooLong { .. } => Some("queue names are limited to 100 characters"),
            _ => None,
        }
    }
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
