//! Generic error handling utilities
//!
//! Provides unified fatal-error reporting for startup failures that can come
//! from configuration, the data directory or the listener.

/// Trait for errors that can distinguish between user-actionable and system errors
///
/// When `is_user_actionable()` returns `true`, `user_message()` should return
/// `Some(message)` with a helpful, actionable message. When it returns
/// `false`, `user_message()` should return `None`.
pub trait ContextualError: std::error::Error {
    /// Returns true if this error carries a message the operator can act on
    /// directly (bad flag, invalid config value, unusable path)
    fn is_user_actionable(&self) -> bool;

    /// Returns the specific user message if this is a user-actionable error
    fn user_message(&self) -> Option<&str>;
}

/// Log errors with appropriate detail level based on error specificity
///
/// User-actionable errors print their own message; system errors print the
/// operation context, with the full error available at debug level.
///
/// # Examples
/// ```rust,no_run
/// # use stashq::core::error_handling::log_error_with_context;
/// # use stashq::core::validation::ValidationError;
/// let err = ValidationError::new("Listen address 'x' must have the form host:port");
/// log_error_with_context(&err, "Loading configuration");
/// // Logs: "FATAL: Listen address 'x' must have the form host:port"
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => log::error!("FATAL: {}", user_msg),
        _ => log::error!("FATAL: {}", operation_context),
    }
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validation::ValidationError;
    use crate::queue::QueueError;

    #[test]
    fn test_validation_error_shows_specific_message() {
        let error = ValidationError::new("client-timeout must be a number");
        assert!(error.is_user_actionable());
        assert_eq!(error.user_message(), Some("client-timeout must be a number"));
        log_error_with_context(&error, "Loading configuration");
    }

    #[test]
    fn test_storage_error_uses_generic_context() {
        let error = QueueError::Io {
            message: "permission denied".to_string(),
        };
        assert!(!error.is_user_actionable());
        assert_eq!(error.user_message(), None);
        log_error_with_context(&error, "Opening data directory");
    }

    #[test]
    fn test_invalid_name_is_user_actionable() {
        let error = QueueError::InvalidName {
            name: "bad name".to_string(),
        };
        assert!(error.is_user_actionable());
        assert!(error.user_message().is_some());
    }
}
