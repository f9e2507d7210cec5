//! Store error types
//!
//! `EditConflict` is the caller-visible optimistic-concurrency outcome and is
//! kept distinct from infrastructure failures so handlers can answer it with
//! a retry hint instead of a generic server error.

use std::time::Duration;

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record with the given identity
    #[error("record not found")]
    NotFound,

    /// Another writer updated the record between this caller's read and its
    /// write; the caller must re-read and retry
    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,

    /// A user with this email address already exists
    #[error("a user with this email address already exists")]
    DuplicateEmail,

    /// The operation did not complete within the per-operation deadline
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    /// True for conditions the client can recover from by changing the
    /// request (as opposed to infrastructure failures)
    pub fn is_client_recoverable(&self) -> bool {
        !matches!(self, StoreError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_distinct_from_infrastructure_failure() {
        assert!(StoreError::EditConflict.is_client_recoverable());
        assert!(StoreError::NotFound.is_client_recoverable());
        assert!(!StoreError::Timeout(Duration::from_secs(3)).is_client_recoverable());
    }
}
