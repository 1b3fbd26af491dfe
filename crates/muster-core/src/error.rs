//! Error types for the console

use thiserror::Error;

use crate::fleet::Field;

/// Console error type
///
/// `Validation` never reaches the network layer; `Network`/`Auth`/`Offline`
/// are transient and user-visible; `Merge` stays contained in the
/// reconciler. None of these are fatal to the session.
#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication required: {0}")]
    Auth(String),

    #[error("Backend offline: {0}")]
    Offline(String),

    #[error("Merge failed for {field}: {reason}")]
    Merge { field: Field, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for ConsoleError {
    fn from(e: serde_json::Error) -> Self {
        ConsoleError::Serialization(e.to_string())
    }
}

/// Result type for console operations
pub type Result<T> = std::result::Result<T, ConsoleError>;
