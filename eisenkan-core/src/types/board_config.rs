//! `BoardConfiguration` — columns, sections, and commit attribution.

use eisenkan_git::Author;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The three allowed priority labels, also the default sections of `todo`.
pub const ALLOWED_PRIORITY_LABELS: [&str; 3] = [
    "urgent-important",
    "urgent-not-important",
    "not-urgent-important",
];

/// `{name, columns[], sections{column->[section]}, git_user, git_email}`.
/// Matches `board.json`'s on-disk field names verbatim so
/// repositories stay portable across implementations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfiguration {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub sections: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_git_user")]
    pub git_user: String,
    #[serde(default = "default_git_email")]
    pub git_email: String,
}

fn default_git_user() -> String {
    Author::default().user
}

fn default_git_email() -> String {
    Author::default().email
}

impl BoardConfiguration {
    /// The built-in default: columns `[todo, doing, done]`, `todo` sectioned
    /// by the three allowed priority labels, fallback author.
    pub fn default_board() -> Self {
        let mut sections = BTreeMap::new();
        sections.insert(
            "todo".to_string(),
            ALLOWED_PRIORITY_LABELS.iter().map(|s| s.to_string()).collect(),
        );

        Self {
            name: "Board".to_string(),
            columns: vec!["todo".to_string(), "doing".to_string(), "done".to_string()],
            sections,
            git_user: default_git_user(),
            git_email: default_git_email(),
        }
    }

    pub fn author(&self) -> Author {
        Author::new(self.git_user.clone(), self.git_email.clone())
    }

    /// 1-based index of `column` in the configured column list, if present.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column).map(|i| i + 1)
    }

    pub fn is_sectioned(&self, column: &str) -> bool {
        self.sections
            .get(column)
            .map(|s| !s.is_empty())
            .unwrap_or(false)
    }

    pub fn sections_of(&self, column: &str) -> &[String] {
        self.sections
            .get(column)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_board_has_three_columns() {
        let board = BoardConfiguration::default_board();
        assert_eq!(board.columns, vec!["todo", "doing", "done"]);
        assert!(board.is_sectioned("todo"));
        assert!(!board.is_sectioned("doing"));
    }

    #[test]
    fn test_column_index_is_one_based() {
        let board = BoardConfiguration::default_board();
        assert_eq!(board.column_index("todo"), Some(1));
        assert_eq!(board.column_index("done"), Some(3));
        assert_eq!(board.column_index("nonexistent"), None);
    }
}
