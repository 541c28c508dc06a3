//! The Eisenhower urgency×importance quadrant.

use crate::error::{BoardError, Result};
use serde::{Deserialize, Serialize};

/// `{urgent, important}`. The `{false, false}` quadrant is forbidden by
/// policy — any operation that would produce it must fail with
/// [`BoardError::PriorityForbidden`] before touching the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priority {
    pub urgent: bool,
    pub important: bool,
}

impl Priority {
    pub fn new(urgent: bool, important: bool) -> Self {
        Self { urgent, important }
    }

    /// Reject the forbidden not-urgent-not-important quadrant. Every write
    /// path calls this before deriving a label or a path.
    pub fn validate(self) -> Result<Self> {
        if !self.urgent && !self.important {
            return Err(BoardError::priority_forbidden(
                "not-urgent-not-important is not an allowed quadrant",
            ));
        }
        Ok(self)
    }

    /// The canonical section/label name for this quadrant. Never accepted
    /// from the caller — always derived, per Invariant 2/3.
    pub fn label(self) -> &'static str {
        match (self.urgent, self.important) {
            (true, true) => "urgent-important",
            (true, false) => "urgent-not-important",
            (false, true) => "not-urgent-important",
            (false, false) => "not-urgent-not-important",
        }
    }

    /// Parse a canonical label back into its quadrant. Used when
    /// reconstructing priority from an on-disk section name.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "urgent-important" => Some(Self::new(true, true)),
            "urgent-not-important" => Some(Self::new(true, false)),
            "not-urgent-important" => Some(Self::new(false, true)),
            _ => None,
        }
    }
}
