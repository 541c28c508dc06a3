//! The on-disk layout algorithm.
//!
//! ```text
//! <repo-root>/
//!   board.json
//!   rules.json                      (optional)
//!   NN_<column>/                    (one per active column)
//!     <section>/                    (only for sectioned columns)
//!       PPPP-task-<id>.json
//!     PPPP-task-<id>.json
//!   archived/
//!     PPPP-task-<id>.json
//!   .eisenkan/config/<type>/<identifier>.json
//! ```
//!
//! Both the `NN_` column prefix and the `PPPP-` position prefix are
//! redundant with configuration but keep the tree `ls`-ordered.

use crate::error::{BoardError, Result};
use crate::types::{BoardConfiguration, TaskId, WorkflowStatus, ARCHIVED_COLUMN};
use std::path::{Path, PathBuf};

pub const BOARD_FILE: &str = "board.json";
pub const RULES_FILE: &str = "rules.json";
pub const ARCHIVED_DIR: &str = "archived";
pub const CONFIG_DIR: &str = ".eisenkan/config";

/// The file name for a task at `position` with identity `id`.
pub fn task_file_name(id: &TaskId, position: u32) -> String {
    format!("{position:04}-task-{id}.json")
}

/// The directory a column's tasks live under: `NN_<column>`.
pub fn column_dir_name(board: &BoardConfiguration, column: &str) -> Result<String> {
    let index = board
        .column_index(column)
        .ok_or_else(|| BoardError::status_invalid(format!("unknown column '{column}'")))?;
    Ok(format!("{index:02}_{column}"))
}

/// Resolve the repository-relative path for a task at the given status.
pub fn resolve_path(board: &BoardConfiguration, id: &TaskId, status: &WorkflowStatus) -> Result<PathBuf> {
    if status.is_archived() {
        return Ok(PathBuf::from(ARCHIVED_DIR).join(task_file_name(id, status.position)));
    }

    let column_dir = column_dir_name(board, &status.column)?;
    let sectioned = board.is_sectioned(&status.column);

    match (&status.section, sectioned) {
        (Some(section), true) => {
            if !board.sections_of(&status.column).iter().any(|s| s == section) {
                return Err(BoardError::status_invalid(format!(
                    "column '{}' has no section '{section}'",
                    status.column
                )));
            }
            Ok(PathBuf::from(column_dir)
                .join(section)
                .join(task_file_name(id, status.position)))
        }
        (None, false) => Ok(PathBuf::from(column_dir).join(task_file_name(id, status.position))),
        (Some(_), false) => Err(BoardError::status_invalid(format!(
            "column '{}' is not sectioned",
            status.column
        ))),
        (None, true) => Err(BoardError::status_invalid(format!(
            "column '{}' requires a section",
            status.column
        ))),
    }
}

/// Path to the generic configuration blob for `(type, identifier)`.
pub fn config_path(config_type: &str, identifier: &str) -> PathBuf {
    PathBuf::from(CONFIG_DIR)
        .join(config_type)
        .join(format!("{identifier}.json"))
}

/// The `PPPP-task-<id>.json` file-name pattern, parsed back into
/// `(position, id)`. Returns `None` if `name` doesn't match.
pub fn parse_task_file_name(name: &str) -> Option<(u32, TaskId)> {
    let stem = name.strip_suffix(".json")?;
    let (position_str, rest) = stem.split_once('-')?;
    let id_str = rest.strip_prefix("task-")?;
    let position: u32 = position_str.parse().ok()?;
    Some((position, TaskId::from_string(id_str)))
}

/// Reconstruct `(column, section, position)` from a repository-relative
/// task path. Used by `BoardStore::read_tasks` to derive status from
/// location rather than file contents.
pub fn parse_task_path(relative: &Path) -> Option<WorkflowStatus> {
    let file_name = relative.file_name()?.to_str()?;
    let (position, _id) = parse_task_file_name(file_name)?;

    let parent = relative.parent()?;
    let mut components: Vec<&str> = parent.iter().filter_map(|c| c.to_str()).collect();
    if components.is_empty() {
        return None;
    }

    if components.len() == 1 && components[0] == ARCHIVED_DIR {
        return Some(WorkflowStatus::archived(position));
    }

    let column_component = components.remove(0);
    let column = column_component.splitn(2, '_').nth(1)?.to_string();
    let section = components.pop().map(|s| s.to_string());

    Some(WorkflowStatus::new(column, section, position))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> BoardConfiguration {
        BoardConfiguration::default_board()
    }

    #[test]
    fn test_resolve_sectioned_path() {
        let board = board();
        let id = TaskId::from_string("X");
        let status = WorkflowStatus::new("todo", Some("urgent-important".to_string()), 1);
        let path = resolve_path(&board, &id, &status).unwrap();
        assert_eq!(path, PathBuf::from("01_todo/urgent-important/0001-task-X.json"));
    }

    #[test]
    fn test_resolve_unsectioned_path() {
        let board = board();
        let id = TaskId::from_string("X");
        let status = WorkflowStatus::new("doing", None, 2);
        let path = resolve_path(&board, &id, &status).unwrap();
        assert_eq!(path, PathBuf::from("02_doing/0002-task-X.json"));
    }

    #[test]
    fn test_resolve_archived_path() {
        let board = board();
        let id = TaskId::from_string("X");
        let status = WorkflowStatus::archived(1);
        let path = resolve_path(&board, &id, &status).unwrap();
        assert_eq!(path, PathBuf::from("archived/0001-task-X.json"));
    }

    #[test]
    fn test_roundtrip_through_path_parsing() {
        let board = board();
        let id = TaskId::from_string("X");
        let status = WorkflowStatus::new("todo", Some("urgent-important".to_string()), 1);
        let path = resolve_path(&board, &id, &status).unwrap();
        let parsed = parse_task_path(&path).unwrap();
        assert_eq!(parsed, status);
    }

    #[test]
    fn test_unknown_column_rejected() {
        let board = board();
        let id = TaskId::from_string("X");
        let status = WorkflowStatus::new("nonexistent", None, 1);
        assert!(resolve_path(&board, &id, &status).is_err());
    }
}
