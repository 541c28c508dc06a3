//! `eisenkan-git` — the `Repository` collaborator.
//!
//! A thin, type-safe wrapper around `git2` that the core depends on only
//! through the [`Repository`] trait, so its tests can run against
//! [`FakeRepository`] instead of a real checkout.

pub mod error;
pub mod fake;
pub mod git2_utils;
pub mod repository;
pub mod types;

pub use error::{GitError, GitResult};
pub use fake::FakeRepository;
pub use repository::{GitRepository, Repository};
pub use types::{Author, Commit};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
