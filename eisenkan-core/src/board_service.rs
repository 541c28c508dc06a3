//! `BoardService` — the public façade, and the only component that takes the
//! write lock.
//!
//! Composes `BoardStore`, `ConfigStore`, `RulesStore`, `RulesDataAggregator`,
//! and `RuleEvaluator` behind a single-writer / multi-reader discipline:
//! every mutating method takes the write lock, every read method the read
//! lock, and moves/updates are the two operations that consult the rule
//! engine before committing.

use crate::board_store::BoardStore;
use crate::cancellation::CancellationToken;
use crate::config_store::{ConfigStore, ConfigurationData};
use crate::error::{BoardError, Result};
use crate::rule_evaluator;
use crate::rules_aggregator::RulesDataAggregator;
use crate::rules_store::RulesStore;
use crate::types::{
    BoardConfiguration, CascadePolicy, EffectRequest, HierarchyFilter, Priority, ProposedTransition,
    QueryCriteria, RuleSet, Task, TaskId, TaskView, ValidationResult, WorkflowStatus,
};
use eisenkan_common::Pretty;
use eisenkan_git::{Commit, Repository};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub struct BoardService {
    board_store: Arc<BoardStore>,
    config_store: Arc<ConfigStore>,
    rules_store: Arc<RulesStore>,
    aggregator: Arc<RulesDataAggregator>,
    lock: RwLock<()>,
}

impl BoardService {
    pub fn new(root: impl Into<PathBuf>, repository: Arc<dyn Repository>) -> Self {
        let root = root.into();
        let board_store = Arc::new(BoardStore::new(root.clone(), Arc::clone(&repository)));
        let config_store = Arc::new(ConfigStore::new(root.clone(), Arc::clone(&repository)));
        let rules_store = Arc::new(RulesStore::new(root.clone(), Arc::clone(&repository)));
        let aggregator = Arc::new(RulesDataAggregator::new(
            Arc::clone(&board_store),
            Arc::clone(&config_store),
            repository,
        ));

        Self {
            board_store,
            config_store,
            rules_store,
            aggregator,
            lock: RwLock::new(()),
        }
    }

    fn check_cancelled(cancel: &CancellationToken, operation: &str) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(BoardError::cancelled(operation));
        }
        Ok(())
    }

    fn dispatch_effects(effects: &[EffectRequest]) {
        for effect in effects {
            info!(rule_id = %effect.rule_id, action = %effect.action, "dispatching rule effect");
        }
    }

    async fn evaluate_transition(&self, transition: &ProposedTransition, rules: &RuleSet) -> Result<Vec<EffectRequest>> {
        debug!("evaluating transition: {}", Pretty(transition));
        let columns = [transition.from.column.clone(), transition.to.column.clone()];
        let data = self.aggregator.aggregate(Some(&transition.task_id), &columns).await;
        let evaluation = rule_evaluator::evaluate(transition, rules, &data);

        if !evaluation.permitted {
            let violation = evaluation
                .violations
                .first()
                .expect("permitted=false implies at least one violation");
            return Err(BoardError::rule_permission(violation.rule_id.clone(), violation.message.clone()));
        }

        Ok(evaluation.effects)
    }

    // ---- mutating operations (write lock) ------------------------------

    pub async fn create_task(
        &self,
        task: Task,
        priority: Priority,
        status: WorkflowStatus,
        cancel: &CancellationToken,
    ) -> Result<TaskId> {
        let _guard = self.lock.write().await;
        Self::check_cancelled(cancel, "create_task")?;

        let board = self.config_store.get_board_configuration().await?;
        let id = self
            .board_store
            .create_task(&board, task, priority, status, cancel)
            .await?;
        Ok(id)
    }

    pub async fn change_task_data(
        &self,
        id: TaskId,
        new_task: Task,
        new_priority: Priority,
        new_status: WorkflowStatus,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let _guard = self.lock.write().await;
        Self::check_cancelled(cancel, "change_task_data")?;

        let board = self.config_store.get_board_configuration().await?;
        let current = self.current_view(&board, &id).await?;
        let rules = self.rules_store.read_rules().await?;

        let transition = ProposedTransition {
            task_id: id.clone(),
            from: current.status.clone(),
            to: new_status.clone(),
            new_priority,
        };
        let effects = self.evaluate_transition(&transition, &rules).await?;

        Self::check_cancelled(cancel, "change_task_data")?;
        self.board_store
            .change_task_data(&board, &id, new_task, new_priority, new_status, cancel)
            .await?;
        Self::dispatch_effects(&effects);
        Ok(())
    }

    pub async fn move_task(
        &self,
        id: TaskId,
        new_priority: Priority,
        new_status: WorkflowStatus,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let _guard = self.lock.write().await;
        Self::check_cancelled(cancel, "move_task")?;

        let board = self.config_store.get_board_configuration().await?;
        let current = self.current_view(&board, &id).await?;
        let rules = self.rules_store.read_rules().await?;

        let transition = ProposedTransition {
            task_id: id.clone(),
            from: current.status.clone(),
            to: new_status.clone(),
            new_priority,
        };
        let effects = self.evaluate_transition(&transition, &rules).await?;

        Self::check_cancelled(cancel, "move_task")?;
        self.board_store
            .move_task(&board, &id, new_priority, new_status, cancel)
            .await?;
        Self::dispatch_effects(&effects);
        Ok(())
    }

    pub async fn archive_task(&self, id: TaskId, cascade: CascadePolicy, cancel: &CancellationToken) -> Result<()> {
        let _guard = self.lock.write().await;
        Self::check_cancelled(cancel, "archive_task")?;

        let board = self.config_store.get_board_configuration().await?;
        self.board_store.archive_task(&board, &id, cascade, cancel).await
    }

    pub async fn remove_task(&self, id: TaskId, cascade: CascadePolicy, cancel: &CancellationToken) -> Result<()> {
        let _guard = self.lock.write().await;
        Self::check_cancelled(cancel, "remove_task")?;
        self.board_store.remove_task(&id, cascade, cancel).await
    }

    pub async fn update_board_configuration(&self, config: BoardConfiguration, cancel: &CancellationToken) -> Result<()> {
        let _guard = self.lock.write().await;
        Self::check_cancelled(cancel, "update_board_configuration")?;
        self.config_store.update_board_configuration(&config).await
    }

    pub async fn store_configuration(
        &self,
        config_type: &str,
        identifier: &str,
        data: ConfigurationData,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let _guard = self.lock.write().await;
        Self::check_cancelled(cancel, "store_configuration")?;
        self.config_store.store(config_type, identifier, data).await
    }

    pub async fn change_rules(&self, set: RuleSet, cancel: &CancellationToken) -> Result<()> {
        let _guard = self.lock.write().await;
        Self::check_cancelled(cancel, "change_rules")?;
        self.rules_store.change_rules(set).await
    }

    // ---- read operations (read lock) -----------------------------------

    pub async fn read_tasks(&self, ids: &[TaskId]) -> Result<Vec<TaskView>> {
        let _guard = self.lock.read().await;
        let board = self.config_store.get_board_configuration().await?;
        self.board_store.read_tasks(&board, ids).await
    }

    pub async fn list_ids(&self, hierarchy: HierarchyFilter) -> Result<Vec<TaskId>> {
        let _guard = self.lock.read().await;
        self.board_store.list_ids(hierarchy).await
    }

    pub async fn find_tasks(&self, criteria: &QueryCriteria) -> Result<Vec<TaskView>> {
        let _guard = self.lock.read().await;
        let board = self.config_store.get_board_configuration().await?;
        self.board_store.find_tasks(&board, criteria).await
    }

    pub async fn get_task_history(&self, id: &TaskId, limit: usize) -> Result<Vec<Commit>> {
        let _guard = self.lock.read().await;
        self.board_store.get_task_history(id, limit).await
    }

    pub async fn get_board_configuration(&self) -> Result<BoardConfiguration> {
        let _guard = self.lock.read().await;
        self.config_store.get_board_configuration().await
    }

    pub async fn load_configuration(&self, config_type: &str, identifier: &str) -> Result<ConfigurationData> {
        let _guard = self.lock.read().await;
        self.config_store.load(config_type, identifier).await
    }

    pub async fn read_rules(&self) -> Result<RuleSet> {
        let _guard = self.lock.read().await;
        self.rules_store.read_rules().await
    }

    /// Pure validation, no I/O — does not need the lock.
    pub fn validate_rule_changes(&self, set: &RuleSet) -> ValidationResult {
        self.rules_store.validate_rule_changes(set)
    }

    async fn current_view(&self, board: &BoardConfiguration, id: &TaskId) -> Result<TaskView> {
        self.board_store
            .read_tasks(board, std::slice::from_ref(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BoardError::not_found("task", id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ALLOWED_PRIORITY_LABELS;
    use eisenkan_git::{Author, GitRepository};
    use tempfile::TempDir;

    async fn service() -> (TempDir, BoardService) {
        let dir = TempDir::new().unwrap();
        let repo = GitRepository::initialize(dir.path(), &Author::default()).unwrap();
        let service = BoardService::new(dir.path(), Arc::new(repo));
        (dir, service)
    }

    fn todo_status(position: u32) -> WorkflowStatus {
        WorkflowStatus::new("todo", Some(ALLOWED_PRIORITY_LABELS[0].to_string()), position)
    }

    #[tokio::test]
    async fn test_create_and_read_round_trip() {
        let (_dir, service) = service().await;
        let cancel = CancellationToken::new();
        let id = service
            .create_task(Task::new("A"), Priority::new(true, true), todo_status(1), &cancel)
            .await
            .unwrap();

        let views = service.read_tasks(&[id]).await.unwrap();
        assert_eq!(views[0].task.title, "A");
    }

    #[tokio::test]
    async fn test_cancelled_before_start_is_rejected() {
        let (_dir, service) = service().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service
            .create_task(Task::new("A"), Priority::new(true, true), todo_status(1), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_move_denied_by_wip_limit_rule() {
        let (_dir, service) = service().await;
        let cancel = CancellationToken::new();

        let id = service
            .create_task(Task::new("A"), Priority::new(true, true), todo_status(1), &cancel)
            .await
            .unwrap();

        let mut conditions = std::collections::BTreeMap::new();
        conditions.insert("wip_at_least".to_string(), serde_json::json!({"column": "doing", "count": 0}));
        let mut actions = std::collections::BTreeMap::new();
        actions.insert("message".to_string(), serde_json::json!("doing is full"));

        let rule = crate::types::Rule {
            id: "wip-cap".to_string(),
            name: "WIP cap".to_string(),
            category: crate::types::RuleCategory::Validation,
            trigger_type: "task_transition".to_string(),
            conditions,
            actions,
            priority: 0,
            enabled: true,
            metadata: std::collections::BTreeMap::new(),
        };
        let set = RuleSet {
            version: "1.0".to_string(),
            rules: vec![rule],
            dependencies: std::collections::BTreeMap::new(),
            metadata: std::collections::BTreeMap::new(),
        };
        service.change_rules(set, &cancel).await.unwrap();

        let err = service
            .move_task(id, Priority::new(true, true), WorkflowStatus::new("doing", None, 1), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::RulePermission { .. }));
    }

    #[tokio::test]
    async fn test_move_noop_does_not_error() {
        let (_dir, service) = service().await;
        let cancel = CancellationToken::new();
        let id = service
            .create_task(Task::new("A"), Priority::new(true, true), todo_status(1), &cancel)
            .await
            .unwrap();

        service
            .move_task(id, Priority::new(true, true), todo_status(1), &cancel)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_remove_nonexistent_is_idempotent() {
        let (_dir, service) = service().await;
        let cancel = CancellationToken::new();
        service
            .remove_task(TaskId::from_string("ghost"), CascadePolicy::None, &cancel)
            .await
            .unwrap();
    }
}
