//! Error types for sqlretry-core

use thiserror::Error;

/// Result type alias using sqlretry-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for configuring retry logic
#[derive(Error, Debug)]
pub enum Error {
    /// A retry option is out of its accepted range
    #[error("Invalid retry configuration for '{field}': {message}")]
    InvalidConfiguration { field: String, message: String },

    /// Settings file not found
    #[error("Retry settings file not found: {path}")]
    ConfigNotFound { path: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed transient error list
    #[error("Invalid transient error list '{value}': {message}")]
    InvalidTransientErrors { value: String, message: String },

    /// Authorized SQL condition is not a valid regular expression
    #[error("Invalid authorized SQL condition: {0}")]
    InvalidAuthorizedCondition(#[from] regex::Error),

    /// Retry method name is not registered
    #[error("Unknown retry method: {method}. Registered methods: {registered}")]
    UnknownRetryMethod { method: String, registered: String },
}

impl Error {
    /// Create an invalid configuration error
    pub fn invalid_configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid transient error list error
    pub fn invalid_transient_errors(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTransientErrors {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create an unknown retry method error from the registered names
    pub fn unknown_retry_method(method: impl Into<String>, registered: &[&str]) -> Self {
        Self::UnknownRetryMethod {
            method: method.into(),
            registered: registered.join(", "),
        }
    }

    /// Check if this error is a configuration range violation
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfiguration { .. })
    }
}
