//! Error types for context memory operations

use thiserror::Error;

/// Result type for context memory operations
pub type Result<T> = std::result::Result<T, ContextError>;

/// Error types for the context window manager and the document store
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Corrupt record {path}: {reason}")]
    CorruptRecord { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<config::ConfigError> for ContextError {
    fn from(err: config::ConfigError) -> Self {
        ContextError::Configuration(err.to_string())
    }
}

impl ContextError {
    /// True for errors caused by caller input rather than storage
    pub fn is_validation(&self) -> bool {
        matches!(self, ContextError::Validation(_))
    }
}
