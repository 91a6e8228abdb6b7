//! Metadata store error types.

use thiserror::Error;

/// Metadata store operation errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MetadataError {
    /// Classify an insert failure, mapping uniqueness and check violations
    /// to their own variants. SQLite reports them by message, PostgreSQL by
    /// SQLSTATE (23505 unique_violation, 23514 check_violation).
    pub(crate) fn from_insert(err: sqlx::Error, what: impl Into<String>) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            let code = db_err.code();
            let message = db_err.message();
            if code.as_deref() == Some("23505") || message.contains("UNIQUE constraint") {
                return Self::AlreadyExists(what.into());
            }
            if code.as_deref() == Some("23514") || message.contains("CHECK constraint") {
                return Self::Constraint(format!("{}: {message}", what.into()));
            }
        }
        Self::Database(err)
    }
}

/// Result type for metadata operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;
