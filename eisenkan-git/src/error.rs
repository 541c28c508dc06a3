//! Error types for the Repository collaborator.
//!
//! Mirrors the error-kind split of the core (`eisenkan_core::error::BoardError`)
//! one layer down: every failure here is either a problem with the repository
//! itself, a wrapped `git2` failure, or an I/O failure, each carrying the
//! operation name that triggered it.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for Repository operations.
pub type GitResult<T> = Result<T, GitError>;

/// Errors that can occur while driving the underlying git repository.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GitError {
    /// Repository not found or invalid at the given path.
    #[error("git repository not found at '{path}': {details}")]
    RepositoryNotFound { path: PathBuf, details: String },

    /// A repository-level operation (stage, commit, history) failed.
    #[error("git operation '{operation}' failed: {details}")]
    RepositoryOperationFailed { operation: String, details: String },

    /// `git2` itself returned an error.
    #[error("git2 operation '{operation}' failed: {source}")]
    Git2Error {
        operation: String,
        #[source]
        source: git2::Error,
    },

    /// An I/O error occurred while performing a git operation.
    #[error("I/O error during git operation '{operation}': {source}")]
    IoError {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// The repository has already been closed.
    #[error("repository already closed")]
    Closed,

    /// Generic error with a free-form message.
    #[error("git error: {message}")]
    Generic { message: String },
}

impl GitError {
    /// Create a repository-not-found error.
    pub fn repository_not_found<P: Into<PathBuf>>(path: P, details: impl Into<String>) -> Self {
        Self::RepositoryNotFound {
            path: path.into(),
            details: details.into(),
        }
    }

    /// Create a repository-operation-failed error.
    pub fn repository_operation_failed(operation: impl Into<String>, details: impl Into<String>) -> Self {
        Self::RepositoryOperationFailed {
            operation: operation.into(),
            details: details.into(),
        }
    }

    /// Wrap a `git2::Error` with operation context.
    pub fn from_git2(operation: impl Into<String>, error: git2::Error) -> Self {
        Self::Git2Error {
            operation: operation.into(),
            source: error,
        }
    }

    /// Wrap a `std::io::Error` with operation context.
    pub fn from_io(operation: impl Into<String>, error: std::io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source: error,
        }
    }

    /// Create a generic error from a string.
    pub fn from_string(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }
}

/// Convert a `git2::Error` to a `GitError` with operation context.
pub fn convert_git2_error(operation: &str, error: git2::Error) -> GitError {
    GitError::from_git2(operation.to_string(), error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GitError::repository_not_found("/tmp/board", "not a git repository");
        assert!(err.to_string().contains("/tmp/board"));
    }

    #[test]
    fn test_generic_error() {
        let err = GitError::from_string("no HEAD commit");
        assert_eq!(err.to_string(), "git error: no HEAD commit");
    }
}
