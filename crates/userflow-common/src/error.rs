//! Error types for userflow

use thiserror::Error;

/// Result type alias for userflow operations
pub type Result<T> = std::result::Result<T, UserflowError>;

/// Errors shared by the producer and the sink
#[derive(Error, Debug)]
pub enum UserflowError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidSetting { name: String, reason: String },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}

impl UserflowError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an error for an environment setting that failed to parse
    pub fn invalid_setting(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
