//! Database Error Types
//!
//! This module defines error types for the store implementations: connection
//! and schema setup for the libsql backend, snapshot loading for the
//! in-memory backend, and row decoding for both.

use crate::models::{Predicate, ValidationError};
use std::path::PathBuf;
use thiserror::Error;

/// Store operation errors
///
/// Store trait methods return `anyhow::Result`; these errors are wrapped into
/// `anyhow` at the trait boundary and keep their context.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to initialize database schema
    #[error("Failed to initialize database schema: {0}")]
    InitializationFailed(String),

    /// Permission denied when accessing database
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// A stored row could not be decoded into a registry type
    #[error("Invalid stored data: {0}")]
    InvalidData(#[from] ValidationError),

    /// A stored value has the wrong shape (bad date, missing join target)
    #[error("Invalid row: {context}")]
    InvalidRow { context: String },

    /// Snapshot file could not be read
    #[error("Failed to read snapshot {path}: {source}")]
    SnapshotRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Snapshot JSON could not be parsed
    #[error("Failed to parse snapshot: {0}")]
    SnapshotParse(#[from] serde_json::Error),

    /// Snapshot references an id it does not define
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Relation query with neither subject nor object
    #[error("Relation query for predicate '{0}' must bind a subject or an object")]
    UnboundRelationQuery(Predicate),
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create an initialization failed error
    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    /// Create an invalid row error
    pub fn invalid_row(context: impl Into<String>) -> Self {
        Self::InvalidRow {
            context: context.into(),
        }
    }

    /// Create an invalid snapshot error
    pub fn invalid_snapshot(msg: impl Into<String>) -> Self {
        Self::InvalidSnapshot(msg.into())
    }
}
