//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, SwapiError>;

/// Errors raised by shared configuration and logging helpers
#[derive(Error, Debug)]
pub enum SwapiError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {name}: '{value}' ({reason})")]
    InvalidVar {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    /// Subscriber could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl SwapiError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn invalid_var(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidVar {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
