//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. duplicate unique value).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A signed delta was applied to a stock key that has no record and the
    /// delta cannot create one.
    #[error("no stock record for the requested product/location")]
    NoSuchStockRecord,

    /// A lifecycle transition was requested from a state that does not
    /// permit it.
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Authentication failure at the domain boundary.
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated but not permitted.
    #[error("forbidden")]
    Forbidden,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidStateTransition(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
