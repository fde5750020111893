//! Database error types.
//!
//! Provides error handling for storage operations using `thiserror`.

use thiserror::Error;

/// Database-specific errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to open or create database connection.
    #[error("failed to open database: {0}")]
    Open(String),

    /// Migration execution failed.
    #[error("migration failed: {0}")]
    Migration(String),

    /// Database record with provided identifier not found.
    #[error("{0}")]
    NotFoundWithMessage(String),

    /// A run already reached its terminal state.
    #[error("run '{0}' is already finalized")]
    AlreadyFinalized(String),

    /// A bulk write exceeded the per-call item limit.
    #[error("batch of {size} items exceeds the limit of {max}")]
    BatchTooLarge {
        /// Items in the rejected batch
        size: usize,
        /// Largest accepted batch
        max: usize,
    },

    /// Failed to decode database value.
    #[error("decode error: {0}")]
    Decode(String),

    /// Underlying `SQLx` error.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error during database operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
