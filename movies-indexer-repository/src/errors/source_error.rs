//! Relational source error types.

use thiserror::Error;

/// Errors from reading the relational movie store.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The database driver failed (connection, query, pool).
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// A row could not be converted into its typed record.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    /// The source was configured with invalid parameters.
    #[error("Invalid source configuration: {0}")]
    InvalidConfiguration(String),
}

impl SourceError {
    /// Create a data integrity error.
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::DataIntegrityError(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Whether the failure is a temporary connectivity problem worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::DatabaseError(err) => matches!(
                err,
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::Protocol(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            Self::DataIntegrityError(_) | Self::InvalidConfiguration(_) => false,
        }
    }
}
