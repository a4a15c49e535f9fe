//! Shared types for the cohort engine
//!
//! The error taxonomy distinguishes role/ownership failures (`Forbidden`)
//! from missing records (`NotFound`) so callers never conflate the two, and
//! keeps transient storage failures in their own retryable class.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by engine operations
#[derive(Debug, Clone, Error)]
pub enum CohortError {
    /// An addressor resolved to nothing
    #[error("Not found: {0}")]
    NotFound(String),

    /// A role or ownership check failed
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// A uniqueness invariant was violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed addressor, unknown relationship label, bad role name
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Transient storage failure — the only retryable class
    #[error("Storage unavailable: {0}")]
    Database(String),
}

impl CohortError {
    /// Whether a caller may retry the failed operation.
    ///
    /// Role checks are evaluated synchronously from loaded state and are
    /// deterministic; only storage failures can succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CohortError::Database(_))
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, CohortError>;

/// The authenticated caller of an operation.
///
/// Threaded explicitly through every call — the engine keeps no ambient
/// "current user" state. `account_id` is the account the caller is currently
/// acting within, which scopes ID-code resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: ObjectId,
    pub account_id: ObjectId,
}

impl Actor {
    pub fn new(user_id: ObjectId, account_id: ObjectId) -> Self {
        Self {
            user_id,
            account_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_database_errors_retryable() {
        assert!(CohortError::Database("timeout".into()).is_retryable());
        assert!(!CohortError::NotFound("x".into()).is_retryable());
        assert!(!CohortError::Forbidden("x".into()).is_retryable());
        assert!(!CohortError::Conflict("x".into()).is_retryable());
        assert!(!CohortError::InvalidInput("x".into()).is_retryable());
    }

    #[test]
    fn test_forbidden_distinct_from_not_found() {
        let forbidden = CohortError::Forbidden("no role".into());
        let missing = CohortError::NotFound("no profile".into());
        assert_ne!(forbidden.to_string(), missing.to_string());
    }
}
