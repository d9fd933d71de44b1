//! Error types for resource management
use thiserror::Error;

/// Boxed error produced by providers and connections.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for resource operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for container and reconciliation operations
#[derive(Error, Debug)]
pub enum Error {
    /// The provider failed to build a connection
    #[error("Failed to provide connection for resource '{resource_id}': {source}")]
    Provide {
        /// The resource identifier
        resource_id: String,
        /// The provider's own error
        #[source]
        source: BoxError,
    },

    /// Closing a connection failed
    #[error("Failed to close connection for resource '{resource_id}': {source}")]
    Close {
        /// The resource identifier
        resource_id: String,
        /// The connection's own error
        #[source]
        source: BoxError,
    },

    /// The refresh pass was cancelled before reaching this resource
    #[error("Refresh cancelled before resource '{resource_id}'")]
    Cancelled {
        /// The first resource that was not attempted
        resource_id: String,
    },

    /// The refresh schedule expression could not be parsed
    #[error("Invalid schedule '{expression}': {reason}")]
    InvalidSchedule {
        /// The rejected expression
        expression: String,
        /// Why it was rejected
        reason: String,
    },

    /// `run` was called while the refresh trigger is already active
    #[error("Container refresh trigger is already running")]
    AlreadyRunning,

    /// Container configuration is invalid
    #[error("Configuration error: {message}")]
    Configuration {
        /// The error message
        message: String,
        /// The underlying error
        #[source]
        source: Option<BoxError>,
    },
}

impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a provider failure for `resource_id`
    pub fn provide(resource_id: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Provide {
            resource_id: resource_id.into(),
            source: source.into(),
        }
    }

    /// Wrap a close failure for `resource_id`
    pub fn close(resource_id: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Close {
            resource_id: resource_id.into(),
            source: source.into(),
        }
    }

    /// Check if this error came from a cancelled pass
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Get the resource ID associated with this error (if any)
    #[must_use]
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            Self::Provide { resource_id, .. }
            | Self::Close { resource_id, .. }
            | Self::Cancelled { resource_id } => Some(resource_id),
            Self::InvalidSchedule { .. } | Self::AlreadyRunning | Self::Configuration { .. } => {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provide_error_keeps_source_and_resource() {
        let err = Error::provide("db", "dial tcp: connection refused");
        assert_eq!(err.resource_id(), Some("db"));
        assert!(err.to_string().contains("connection refused"));
        let source = std::error::Error::source(&err).expect("source should be kept");
        assert_eq!(source.to_string(), "dial tcp: connection refused");
    }

    #[test]
    fn cancelled_is_detected() {
        let err = Error::Cancelled {
            resource_id: "cache".into(),
        };
        assert!(err.is_cancelled());
        assert!(!Error::AlreadyRunning.is_cancelled());
    }

    #[test]
    fn schedule_errors_have_no_resource() {
        let err = Error::InvalidSchedule {
            expression: "bogus".into(),
            reason: "bad field".into(),
        };
        assert_eq!(err.resource_id(), None);
        assert_eq!(Error::configuration("x").resource_id(), None);
    }
}
