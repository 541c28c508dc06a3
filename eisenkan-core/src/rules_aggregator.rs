//! `RulesDataAggregator` — assembles the `RulesData` snapshot the
//! `RuleEvaluator` consumes.
//!
//! Read-only, and deliberately tolerant: a missing board configuration or an
//! unreadable history degrades to a default/empty value with a `warn!`, not
//! an error — the aggregator's job is to give the evaluator its best
//! available picture of the board, not to gate the operation itself.

use crate::board_store::BoardStore;
use crate::config_store::ConfigStore;
use crate::trailers::{parse_move_trailer, legacy_enters_column, MOVE_TRAILER};
use crate::types::{BoardConfiguration, QueryCriteria, RulesData, TaskId};
use eisenkan_git::{Commit, Repository};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

const HISTORY_LIMIT: usize = 512;

pub struct RulesDataAggregator {
    board_store: Arc<BoardStore>,
    config_store: Arc<ConfigStore>,
    repository: Arc<dyn Repository>,
}

impl RulesDataAggregator {
    pub fn new(board_store: Arc<BoardStore>, config_store: Arc<ConfigStore>, repository: Arc<dyn Repository>) -> Self {
        Self {
            board_store,
            config_store,
            repository,
        }
    }

    /// Assemble a `RulesData` snapshot for `task_id` (optional) and
    /// `target_columns` (empty means "every configured column").
    pub async fn aggregate(&self, task_id: Option<&TaskId>, target_columns: &[String]) -> RulesData {
        let board = self.load_board().await;

        let active = match self
            .board_store
            .find_tasks(&board, &QueryCriteria::new().with_archived(false))
            .await
        {
            Ok(views) => views,
            Err(e) => {
                warn!(error = %e, "failed to read active tasks for rules aggregation");
                Vec::new()
            }
        };

        let mut wip_counts = BTreeMap::new();
        for column in &board.columns {
            let count = active.iter().filter(|v| &v.status.column == column).count();
            wip_counts.insert(column.clone(), count);
        }

        let columns_of_interest: Vec<String> = if target_columns.is_empty() {
            board.columns.clone()
        } else {
            target_columns.to_vec()
        };

        let mut column_tasks = BTreeMap::new();
        for column in &columns_of_interest {
            let tasks = active
                .iter()
                .filter(|v| &v.status.column == column)
                .cloned()
                .collect();
            column_tasks.insert(column.clone(), tasks);
        }

        let task_history = match task_id {
            Some(id) => match self.board_store.get_task_history(id, HISTORY_LIMIT).await {
                Ok(history) => history,
                Err(e) => {
                    warn!(%id, error = %e, "failed to read task history for rules aggregation");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let column_enter_times = self.column_enter_times(&columns_of_interest).await;

        let mut board_metadata = BTreeMap::new();
        board_metadata.insert("board_name".to_string(), board.name.clone());
        board_metadata.insert("columns".to_string(), board.columns.join(","));

        RulesData {
            wip_counts,
            column_tasks,
            task_history,
            column_enter_times,
            board_metadata,
        }
    }

    async fn load_board(&self) -> BoardConfiguration {
        match self.config_store.get_board_configuration().await {
            Ok(board) => board,
            Err(e) => {
                warn!(error = %e, "failed to read board configuration, falling back to default");
                BoardConfiguration::default_board()
            }
        }
    }

    /// For each column of interest, the timestamp of the most recent commit
    /// whose message records entry into that column: the structured
    /// `EisenKan-Move` trailer first, the legacy `"to <column>"` substring
    /// scan as fallback.
    async fn column_enter_times(&self, columns: &[String]) -> BTreeMap<String, chrono::DateTime<chrono::Utc>> {
        let history: Vec<Commit> = match self.repository.get_history(HISTORY_LIMIT).await {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "failed to read repository history for column-entry times");
                return BTreeMap::new();
            }
        };

        let mut times = BTreeMap::new();
        for column in columns {
            let found = history.iter().find_map(|commit| {
                if let Some(trailer) = commit.trailer(MOVE_TRAILER) {
                    if let Some((_, to)) = parse_move_trailer(trailer) {
                        if to == column {
                            return Some(commit.timestamp);
                        }
                    }
                    return None;
                }
                legacy_enters_column(&commit.message, column).then_some(commit.timestamp)
            });
            if let Some(timestamp) = found {
                times.insert(column.clone(), timestamp);
            }
        }
        times
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;
    use crate::config_store::ConfigStore;
    use crate::types::{Priority, Task, WorkflowStatus};
    use eisenkan_git::{Author, GitRepository};
    use tempfile::TempDir;

    async fn aggregator() -> (TempDir, Arc<BoardStore>, RulesDataAggregator) {
        let dir = TempDir::new().unwrap();
        let repo: Arc<dyn Repository> = Arc::new(GitRepository::initialize(dir.path(), &Author::default()).unwrap());
        let board_store = Arc::new(BoardStore::new(dir.path(), Arc::clone(&repo)));
        let config_store = Arc::new(ConfigStore::new(dir.path(), Arc::clone(&repo)));
        let aggregator = RulesDataAggregator::new(Arc::clone(&board_store), config_store, repo);
        (dir, board_store, aggregator)
    }

    #[tokio::test]
    async fn test_wip_counts_cover_every_column() {
        let (_dir, board_store, aggregator) = aggregator().await;
        let board = BoardConfiguration::default_board();
        let cancel = CancellationToken::new();
        board_store
            .create_task(
                &board,
                Task::new("A"),
                Priority::new(true, true),
                WorkflowStatus::new("todo", Some("urgent-important".to_string()), 1),
                &cancel,
            )
            .await
            .unwrap();

        let data = aggregator.aggregate(None, &[]).await;
        assert_eq!(data.wip_counts.get("todo"), Some(&1));
        assert_eq!(data.wip_counts.get("doing"), Some(&0));
        assert_eq!(data.wip_counts.get("done"), Some(&0));
    }

    #[tokio::test]
    async fn test_column_enter_time_recorded_on_move() {
        let (_dir, board_store, aggregator) = aggregator().await;
        let board = BoardConfiguration::default_board();
        let cancel = CancellationToken::new();
        let id = board_store
            .create_task(
                &board,
                Task::new("A"),
                Priority::new(true, true),
                WorkflowStatus::new("todo", Some("urgent-important".to_string()), 1),
                &cancel,
            )
            .await
            .unwrap();

        board_store
            .move_task(
                &board,
                &id,
                Priority::new(true, true),
                WorkflowStatus::new("doing", None, 1),
                &cancel,
            )
            .await
            .unwrap();

        let data = aggregator.aggregate(Some(&id), &["doing".to_string()]).await;
        assert!(data.column_enter_times.contains_key("doing"));
        assert_eq!(data.task_history.len(), 2);
    }

    #[tokio::test]
    async fn test_board_metadata_present() {
        let (_dir, _board_store, aggregator) = aggregator().await;
        let data = aggregator.aggregate(None, &[]).await;
        assert_eq!(data.board_metadata.get("board_name"), Some(&"Board".to_string()));
        assert_eq!(data.board_metadata.get("columns"), Some(&"todo,doing,done".to_string()));
    }
}
