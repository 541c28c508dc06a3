//! Logging utilities shared by every EisenKan crate.

use serde::Serialize;
use std::fmt::Debug;

/// Wrapper for pretty-printing types in `tracing` statements as YAML.
///
/// ```ignore
/// use eisenkan_common::Pretty;
/// use tracing::debug;
///
/// debug!("transition: {}", Pretty(&proposed_transition));
/// ```
///
/// Falls back to `{:#?}` if YAML serialization fails.
pub struct Pretty<T>(pub T);

impl<T: Serialize + Debug> std::fmt::Display for Pretty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_yaml_ng::to_string(&self.0) {
            Ok(yaml) => write!(f, "\n{}", yaml),
            Err(_) => write!(f, "\n{:#?}", self.0),
        }
    }
}

impl<T: Serialize + Debug> std::fmt::Debug for Pretty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_yaml_ng::to_string(&self.0) {
            Ok(yaml) => write!(f, "\n{}", yaml),
            Err(_) => write!(f, "\n{:#?}", self.0),
        }
    }
}
