//! Configuration error type

use std::path::PathBuf;

use thiserror::Error;

/// Standard result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or reading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read configuration file '{}': {source}", path.display())]
    Io {
        /// The file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON
    #[error("Failed to parse configuration from {origin}: {source}")]
    Parse {
        /// Where the document came from
        origin: String,
        /// The parser error
        #[source]
        source: serde_json::Error,
    },

    /// Nothing exists at the requested path
    #[error("Configuration path '{path}' not found: {message}")]
    PathNotFound {
        /// The requested dot path
        path: String,
        /// Which segment failed
        message: String,
    },

    /// A value exists but has the wrong shape
    #[error("Configuration value at '{path}' is not {expected}: {message}")]
    Type {
        /// The requested dot path
        path: String,
        /// The requested Rust type
        expected: &'static str,
        /// The deserializer message
        message: String,
    },
}

impl ConfigError {
    /// Create a path error
    pub fn path_error(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::PathNotFound {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a type error
    pub fn type_error(
        message: impl Into<String>,
        path: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::Type {
            path: path.into(),
            expected,
            message: message.into(),
        }
    }

    /// Whether the requested path was absent
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PathNotFound { .. })
    }
}
