//! Error types for AtlasID
//!
//! Provides a unified error type for all operations.
//!
//! Display strings of the argument/command variants are part of the wire
//! contract: they are sent verbatim as `-ERROR <message>` replies.

use thiserror::Error;

/// Result type alias using AtlasError
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Unified error type for AtlasID operations
#[derive(Debug, Error)]
pub enum AtlasError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors (connection-fatal)
    // -------------------------------------------------------------------------
    #[error("Malformed request: {0}")]
    Protocol(String),

    /// An `-ERROR` reply received by a client
    #[error("Server error: {0}")]
    Remote(String),

    // -------------------------------------------------------------------------
    // Argument Errors
    // -------------------------------------------------------------------------
    #[error("Not enough arguments for the command")]
    NotEnoughArguments,

    #[error("Expected integer")]
    ExpectedInteger,

    #[error("Method is not supported")]
    MethodNotSupported,

    // -------------------------------------------------------------------------
    // Key Errors
    // -------------------------------------------------------------------------
    #[error("no key for set")]
    NoKey,

    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("{0}: have no id key")]
    KeyNotFound(String),

    #[error("{0}: sequence exhausted")]
    SequenceExhausted(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Store error: {0}")]
    Store(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Internal faults
    // -------------------------------------------------------------------------
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AtlasError {
    /// Whether the error only fails the current request.
    ///
    /// Request-fatal errors become a single `-ERROR` reply and the connection
    /// keeps serving. Everything else closes the connection after the reply.
    pub fn is_request_fatal(&self) -> bool {
        !matches!(
            self,
            AtlasError::Io(_) | AtlasError::Protocol(_) | AtlasError::Internal(_)
        )
    }
}
