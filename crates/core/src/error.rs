//! Core Error Types
//!
//! Defines the foundational error types used across the Insight Desk workspace.
//! These error types depend only on thiserror to keep the core crate
//! lightweight.
//!
//! The main application crate wraps these in `AppError` alongside the
//! storage-level variants it needs.

use thiserror::Error;

/// Core error type for the Insight Desk workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors (unknown event names, missing sessions)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Parse errors (malformed event payloads)
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
