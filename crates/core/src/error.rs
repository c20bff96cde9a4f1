// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
///
/// Errors returned by a unit of work passed to
/// [`TransactionCoordinator::run`](crate::application::TransactionCoordinator::run)
/// travel through the coordinator unchanged. Only the transaction boundary
/// variants (`AcquireFailed`, `CommitFailed`, `RollbackFailed`) are produced
/// by the coordinator itself.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Statement execution failed inside the store (ExecFailed)
    #[error("Database error: {0}")]
    Database(String),

    #[error("Failed to acquire connection: {0}")]
    AcquireFailed(String),

    #[error("Failed to commit transaction: {0}")]
    CommitFailed(String),

    /// Rollback failed after an earlier failure; `cause` is that failure.
    #[error("Failed to roll back transaction: {rollback} (original failure: {cause})")]
    RollbackFailed {
        rollback: String,
        #[source]
        cause: Box<AppError>,
    },

    #[error("Sequence recovery failed: {0}")]
    RecoveryFailed(String),

    #[error("Sequence allocator unavailable: {0}")]
    AllocatorUnavailable(String),

    #[error("Transaction cancelled: {0}")]
    Cancelled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for failures at the transaction boundary (commit or rollback).
    ///
    /// These are fatal to the current operation; the caller should not
    /// assume anything about the state of the store beyond "not committed".
    pub fn is_transaction_boundary(&self) -> bool {
        matches!(
            self,
            AppError::CommitFailed(_) | AppError::RollbackFailed { .. }
        )
    }

    /// True when retrying the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::AcquireFailed(_) | AppError::Cancelled(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to AppError::Database(String)
