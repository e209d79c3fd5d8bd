//! Custom error types for the common library
//!
//! This module defines the errors raised by the document store and the
//! object storage adapters. Services map them onto their own wire contract.

use sqlx::Error as SqlxError;
use std::time::Duration;
use thiserror::Error;

/// Custom error type for document store operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),

    /// A write collided with a unique index
    #[error("Duplicate value for unique field(s): {}", .fields.join(", "))]
    UniqueViolation {
        /// Fields covered by the violated index
        fields: Vec<String>,
    },

    /// A stored body could not be converted to or from its typed form
    #[error("Document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Custom error type for remote object storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// The remote call did not complete in time
    #[error("Storage request timed out after {0:?}")]
    Timeout(Duration),

    /// Transport or service failure reported by the SDK
    #[error("Storage service error: {0}")]
    Upstream(String),

    /// The service answered, but the answer describes a failure
    #[error("Storage service rejected the request: {0}")]
    Rejected(String),

    /// The local temporary file could not be read
    #[error("Failed to read local file: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Storage configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Timeout(_) | StorageError::Upstream(_))
    }
}

/// Type alias for Result with StorageError
pub type StorageResult<T> = Result<T, StorageError>;
