//! Database error types for capstone-db.

use capstone_core::errors::CoreError;
use thiserror::Error;

/// Errors from database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The operation was refused by a workflow rule.
    #[error(transparent)]
    Workflow(#[from] CoreError),

    /// A SQL query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Invalid state encountered (e.g., bad data in DB).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DatabaseError {
    /// The domain error, when the failure was a rule rather than storage.
    #[must_use]
    pub const fn workflow(&self) -> Option<&CoreError> {
        match self {
            Self::Workflow(e) => Some(e),
            _ => None,
        }
    }

    /// Stable kind string for callers mapping errors to exit or status codes.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Workflow(e) => e.kind(),
            _ => "internal",
        }
    }
}

/// Whether a libSQL error is a unique-index violation.
pub(crate) fn is_unique_violation(e: &libsql::Error) -> bool {
    e.to_string().contains("UNIQUE constraint failed")
}

/// Turn a unique-index violation into the given workflow error.
pub(crate) fn on_unique(e: libsql::Error, conflict: impl FnOnce() -> CoreError) -> DatabaseError {
    if is_unique_violation(&e) {
        DatabaseError::Workflow(conflict())
    } else {
        DatabaseError::LibSql(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstone_core::enums::EntityType;

    #[test]
    fn workflow_errors_are_exposed() {
        let err: DatabaseError = CoreError::not_found(EntityType::Team, "tem-00000000").into();
        assert_eq!(err.kind(), "not_found");
        assert!(err.workflow().is_some());
        assert_eq!(err.to_string(), "Entity not found: team tem-00000000");
    }

    #[test]
    fn storage_errors_are_internal() {
        let err = DatabaseError::InvalidState("bad stage".into());
        assert_eq!(err.kind(), "internal");
        assert!(err.workflow().is_none());
    }
}
