//! Persistence error model.

use thiserror::Error;

use plantops_core::DomainError;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error surfaced by the persistence layer.
///
/// Domain failures (not-found, guard violations, ledger refusals) pass
/// through unchanged; everything else is a storage failure the caller must
/// treat as an abort of the enclosing business transaction.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage failure: {0}")]
    Storage(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        // Unique-key violations are business conflicts, not outages.
        if let sqlx::Error::Database(db) = &e {
            if db.code().as_deref() == Some("23505") {
                return RepoError::Domain(DomainError::conflict(db.message().to_string()));
            }
        }
        RepoError::Storage(e)
    }
}
