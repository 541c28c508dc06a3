//! Shared error primitives used across the EisenKan crates.
//!
//! This crate deliberately stays small — it is the base dependency every
//! other EisenKan crate sits on top of.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for common-layer operations.
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors that can arise from shared filesystem/path utilities.
#[derive(Error, Debug)]
pub enum CommonError {
    /// Failed to create a directory.
    #[error("failed to create directory: {0}")]
    DirectoryCreation(#[from] std::io::Error),

    /// An encountered path was not valid for the operation attempted.
    #[error("invalid path: {path}")]
    InvalidPath { path: PathBuf },

    /// Free-form error with a custom message.
    #[error("{message}")]
    Other { message: String },
}

impl CommonError {
    /// Create a new invalid-path error.
    pub fn invalid_path(path: PathBuf) -> Self {
        Self::InvalidPath { path }
    }

    /// Create a new free-form error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}
