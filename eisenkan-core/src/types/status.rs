//! `WorkflowStatus` — a task's location on the board.

use serde::{Deserialize, Serialize};

/// The reserved column name tasks move to on archival.
pub const ARCHIVED_COLUMN: &str = "archived";

/// `{column, section, position}`. `column` names one of the board's
/// configured columns or the reserved [`ARCHIVED_COLUMN`]. `section` is
/// non-empty only for columns that declare sections. `position` is a
/// positive integer giving ordering within the `(column, section)` cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStatus {
    pub column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub position: u32,
}

impl WorkflowStatus {
    pub fn new(column: impl Into<String>, section: Option<String>, position: u32) -> Self {
        Self {
            column: column.into(),
            section,
            position,
        }
    }

    pub fn archived(position: u32) -> Self {
        Self {
            column: ARCHIVED_COLUMN.to_string(),
            section: None,
            position,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.column == ARCHIVED_COLUMN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archived_constructor() {
        let status = WorkflowStatus::archived(7);
        assert!(status.is_archived());
        assert_eq!(status.section, None);
        assert_eq!(status.position, 7);
    }
}
