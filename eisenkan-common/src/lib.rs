//! # eisenkan-common
//!
//! Foundational error and logging primitives shared by every EisenKan crate.
//! This is the base dependency `eisenkan-git` and `eisenkan-core` both sit on.

pub mod error;
pub mod logging;

pub use error::{CommonError, Result};
pub use logging::Pretty;
