//! Result and error types for jsonp-stub.

use thiserror::Error;

/// Result type for jsonp-stub operations
pub type StubResult<T> = Result<T, StubError>;

/// Errors that can occur while stubbing script sources
#[derive(Debug, Error)]
pub enum StubError {
    /// The host would not let the `src` accessor be redefined
    #[error("Host refused to override the script src accessor: {message}")]
    InstallRefused {
        /// Error message
        message: String,
    },

    /// The accessor override is already in place
    #[error("Script src interception is already installed; it only needs to run once")]
    AlreadyInstalled,

    /// A URL parameter value is not valid percent-encoding
    #[error("Malformed URL parameter '{key}={value}': {reason}")]
    MalformedParameter {
        /// Parameter name (undecoded)
        key: String,
        /// Raw parameter value
        value: String,
        /// Why decoding failed
        reason: String,
    },

    /// A rule or config file is unusable
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// A substitute resource could not be created
    #[error("Failed to create substitute resource: {message}")]
    ResourceCreation {
        /// Error message
        message: String,
    },

    /// The payload formatter rejected its input
    #[error("Failed to format payload: {message}")]
    Format {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Regex compilation error
    #[error("Invalid regex: {0}")]
    Regex(#[from] regex::Error),
}

impl StubError {
    /// Shorthand for [`StubError::InvalidConfiguration`]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}
