//! Workflow Error Types
//!
//! Every state-machine violation is rejected locally and returned as a
//! typed error before any mutation; callers translate these into
//! user-visible messages.

use thiserror::Error;

/// Workflow error kinds
///
/// Error codes are stable identifiers for API responses.
#[derive(Error, Debug, Clone)]
pub enum WorkflowError {
    /// Action not legal from the object's current status, including
    /// "already terminal" and losing a concurrent transition race.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Actor lacks the required role relationship for this action.
    #[error("Not authorized for this action")]
    Unauthorized,

    /// A required field is missing or malformed.
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Object id does not resolve.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The external side effect required by the transition failed; the
    /// record stays in its previous state.
    #[error("Dependency failure: {0}")]
    DependencyFailure(String),

    /// Persistence layer failure.
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl WorkflowError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::InvalidTransition(_) => "INVALID_TRANSITION",
            WorkflowError::Unauthorized => "UNAUTHORIZED",
            WorkflowError::ValidationError(_) => "VALIDATION_ERROR",
            WorkflowError::NotFound(_) => "NOT_FOUND",
            WorkflowError::DependencyFailure(_) => "DEPENDENCY_FAILURE",
            WorkflowError::StorageError(_) => "STORAGE_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            WorkflowError::InvalidTransition(_) => 409,
            WorkflowError::Unauthorized => 403,
            WorkflowError::ValidationError(_) => 400,
            WorkflowError::NotFound(_) => 404,
            WorkflowError::DependencyFailure(_) => 502,
            WorkflowError::StorageError(_) => 500,
        }
    }
}

impl From<sqlx::Error> for WorkflowError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => WorkflowError::NotFound("record not found".to_string()),
            other => WorkflowError::StorageError(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for WorkflowError {
    fn from(e: anyhow::Error) -> Self {
        WorkflowError::StorageError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            WorkflowError::InvalidTransition("Pending".into()).code(),
            "INVALID_TRANSITION"
        );
        assert_eq!(WorkflowError::Unauthorized.code(), "UNAUTHORIZED");
        assert_eq!(
            WorkflowError::DependencyFailure("delete failed".into()).code(),
            "DEPENDENCY_FAILURE"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(WorkflowError::Unauthorized.http_status(), 403);
        assert_eq!(
            WorkflowError::InvalidTransition("terminal".into()).http_status(),
            409
        );
        assert_eq!(
            WorkflowError::ValidationError("empty note".into()).http_status(),
            400
        );
        assert_eq!(WorkflowError::NotFound("T1".into()).http_status(), 404);
        assert_eq!(
            WorkflowError::StorageError("down".into()).http_status(),
            500
        );
    }

    #[test]
    fn test_display() {
        let err = WorkflowError::ValidationError("rejection note is required".into());
        assert_eq!(
            err.to_string(),
            "Validation failed: rejection note is required"
        );
    }
}
