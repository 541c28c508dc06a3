//! Error kinds for the board engine.

use thiserror::Error;

/// Result type for board engine operations.
pub type Result<T> = std::result::Result<T, BoardError>;

/// The error kinds a board-engine operation can fail with. Validation
/// failures surface before any filesystem mutation; `RepositoryError` always
/// carries the operation that triggered it.
#[derive(Debug, Error)]
pub enum BoardError {
    /// A task body failed validation (e.g. empty title).
    #[error("invalid task: {message}")]
    TaskInvalid { message: String },

    /// The not-urgent-not-important quadrant was requested.
    #[error("priority forbidden: {message}")]
    PriorityForbidden { message: String },

    /// An unknown column or section was named.
    #[error("invalid status: {message}")]
    StatusInvalid { message: String },

    /// The requested resource does not exist.
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// The rule evaluator rejected the transition.
    #[error("rule '{rule_id}' denied the operation: {message}")]
    RulePermission { rule_id: String, message: String },

    /// A rule set failed structural validation.
    #[error("invalid rule set: {message}")]
    RuleSetInvalid { message: String },

    /// The underlying repository failed.
    #[error("repository operation '{operation}' failed: {source}")]
    RepositoryError {
        operation: String,
        #[source]
        source: eisenkan_git::GitError,
    },

    /// The operation was cancelled before it committed.
    #[error("operation cancelled: {operation}")]
    Cancelled { operation: String },

    /// Reserved for future multi-writer conflict detection.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Malformed on-disk JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying I/O failure not already wrapped by the repository.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BoardError {
    pub fn task_invalid(message: impl Into<String>) -> Self {
        Self::TaskInvalid {
            message: message.into(),
        }
    }

    pub fn priority_forbidden(message: impl Into<String>) -> Self {
        Self::PriorityForbidden {
            message: message.into(),
        }
    }

    pub fn status_invalid(message: impl Into<String>) -> Self {
        Self::StatusInvalid {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    pub fn rule_permission(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RulePermission {
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }

    pub fn rule_set_invalid(message: impl Into<String>) -> Self {
        Self::RuleSetInvalid {
            message: message.into(),
        }
    }

    pub fn repository(operation: impl Into<String>, source: eisenkan_git::GitError) -> Self {
        Self::RepositoryError {
            operation: operation.into(),
            source,
        }
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// `NotFound` on remove is success; every other site treats it
    /// as an error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BoardError::not_found("task", "abc123");
        assert_eq!(err.to_string(), "task not found: abc123");
    }

    #[test]
    fn test_is_not_found() {
        assert!(BoardError::not_found("task", "x").is_not_found());
        assert!(!BoardError::task_invalid("empty title").is_not_found());
    }
}
