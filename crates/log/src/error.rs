//! Error type for logger setup

use thiserror::Error;

/// Result type for logging operations
pub type LogResult<T> = Result<T, LogError>;

/// Errors raised while building or reconfiguring the logger
#[derive(Error, Debug)]
pub enum LogError {
    /// The filter directive string did not parse
    #[error("Invalid filter '{filter}': {reason}")]
    Filter {
        /// The rejected directives
        filter: String,
        /// Parser message
        reason: String,
    },

    /// A global subscriber is already installed
    #[error("Failed to install logger: {0}")]
    Init(String),

    /// Runtime reconfiguration failed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LogError {
    /// Create a filter parsing error
    pub fn filter(filter: impl Into<String>, reason: impl ToString) -> Self {
        Self::Filter {
            filter: filter.into(),
            reason: reason.to_string(),
        }
    }
}
