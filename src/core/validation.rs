//! Validation utilities for names and configuration values
//!
//! Queue and consumer group names end up as directory names and key
//! prefixes, so both are restricted to a small, filesystem-safe alphabet.

use crate::core::error_handling::ContextualError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Longest accepted queue name
pub const MAX_QUEUE_NAME_LEN: usize = 100;

static QUEUE_NAME_INVALID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_\-]").expect("valid queue name regex"));

static GROUP_NAME_INVALID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_]").expect("valid group name regex"));

/// Configuration or argument validation failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ContextualError for ValidationError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<&str> {
        Some(&self.message)
    }
}

/// Outcome of a name check, mapped to the caller's own error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameCheck {
    Valid,
    InvalidCharacters,
    TooLong,
}

/// Check a queue name: alphanumeric plus `_` and `-`, at most 100 characters
pub fn check_queue_name(name: &str) -> NameCheck {
    if name.is_empty() || QUEUE_NAME_INVALID.is_match(name) {
        NameCheck::InvalidCharacters
    } else if name.len() > MAX_QUEUE_NAME_LEN {
        NameCheck::TooLong
    } else {
        NameCheck::Valid
    }
}

/// Check a consumer group name: alphanumeric plus `_`
pub fn check_group_name(name: &str) -> NameCheck {
    if name.is_empty() || GROUP_NAME_INVALID.is_match(name) {
        NameCheck::InvalidCharacters
    } else {
        NameCheck::Valid
    }
}

/// Validate a listen address of the form `host:port`
pub fn validate_listen_address(value: &str) -> Result<String, ValidationError> {
    match value.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => match port.parse::<u16>() {
            Ok(_) => Ok(value.to_string()),
            Err(_) => Err(ValidationError::new(format!(
                "'{}' is not a valid port in listen address '{}'",
                port, value
            ))),
        },
        _ => Err(ValidationError::new(format!(
            "Listen address '{}' must have the form host:port",
            value
        ))),
    }
}
