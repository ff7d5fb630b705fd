//! Error types for LogKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::wal::DecodeError;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for LogKV operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("engine is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Log Errors (replay only, never returned by engine operations)
    // -------------------------------------------------------------------------
    #[error("malformed record at line {line}: {source}")]
    MalformedRecord {
        line: u64,
        #[source]
        source: DecodeError,
    },

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KvError {
    /// True when the error means "the key does not exist" rather than
    /// "storage is unavailable".
    pub fn is_not_found(&self) -> bool {
        matches!(self, KvError::KeyNotFound(_))
    }
}
