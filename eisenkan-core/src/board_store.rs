//! `BoardStore` — the core storage engine.
//!
//! Owns the on-disk layout and the translation between the in-memory task
//! model and file paths. Column, section, position, and priority label are
//! derived from a task's path; `created_at`/`updated_at` and (for tasks
//! outside a sectioned column) the current priority are derived from commit
//! history, via the `EisenKan-Priority`/`EisenKan-Move` commit trailers (see
//! `crate::trailers`).

use crate::cancellation::CancellationToken;
use crate::error::{BoardError, Result};
use crate::paths::{self, parse_task_path, resolve_path};
use crate::trailers::{MOVE_TRAILER, PRIORITY_TRAILER};
use crate::types::{
    BoardConfiguration, CascadePolicy, HierarchyFilter, Priority, QueryCriteria, Task, TaskId,
    TaskView, WorkflowStatus, ARCHIVED_COLUMN,
};
use chrono::{DateTime, Utc};
use eisenkan_git::{Commit, GitError, Repository};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

/// History reads are bounded, not unlimited.
const HISTORY_LIMIT: usize = 512;

pub struct BoardStore {
    root: PathBuf,
    repository: Arc<dyn Repository>,
    /// Memoized id -> relative-path index, invalidated on every commit
    ///.
    path_index: AsyncMutex<Option<HashMap<TaskId, PathBuf>>>,
}

impl BoardStore {
    pub fn new(root: impl Into<PathBuf>, repository: Arc<dyn Repository>) -> Self {
        Self {
            root: root.into(),
            repository,
            path_index: AsyncMutex::new(None),
        }
    }

    // ---- path index -----------------------------------------------------

    async fn path_index(&self) -> Result<HashMap<TaskId, PathBuf>> {
        let mut guard = self.path_index.lock().await;
        if let Some(index) = guard.as_ref() {
            return Ok(index.clone());
        }
        let index = self.scan_task_paths().await?;
        *guard = Some(index.clone());
        Ok(index)
    }

    async fn invalidate_index(&self) {
        *self.path_index.lock().await = None;
    }

    /// Walk the working tree for `*-task-<id>.json` file names. First match
    /// wins is not an option here — a duplicate is a genuine violation of
    /// Invariant 1, reported as `RepositoryError`.
    async fn scan_task_paths(&self) -> Result<HashMap<TaskId, PathBuf>> {
        let mut map = HashMap::new();
        let mut stack = vec![self.root.clone()];

        while let Some(dir) = stack.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(BoardError::Io(e)),
            };

            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();

                if file_type.is_dir() {
                    if matches!(path.file_name().and_then(|n| n.to_str()), Some(".eisenkan") | Some(".git")) {
                        continue;
                    }
                    stack.push(path);
                    continue;
                }

                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let Some((_, id)) = paths::parse_task_file_name(name) else {
                    continue;
                };
                let relative = path
                    .strip_prefix(&self.root)
                    .expect("walked path is under root")
                    .to_path_buf();

                if let Some(existing) = map.insert(id.clone(), relative.clone()) {
                    return Err(BoardError::repository(
                        "scan_task_paths",
                        GitError::from_string(format!(
                            "ambiguous task id '{id}': found at both '{}' and '{}'",
                            existing.display(),
                            relative.display()
                        )),
                    ));
                }
            }
        }

        Ok(map)
    }

    async fn find_task_path(&self, id: &TaskId) -> Result<Option<PathBuf>> {
        Ok(self.path_index().await?.get(id).cloned())
    }

    // ---- file IO ----------------------------------------------------

    async fn read_task_body(&self, id: &TaskId, relative: &Path) -> Result<Task> {
        let absolute = self.root.join(relative);
        let content = tokio::fs::read_to_string(&absolute).await?;
        let mut task: Task = serde_json::from_str(&content)?;
        task.id = id.clone();
        Ok(task)
    }

    async fn write_task_body(&self, relative: &Path, task: &Task) -> Result<()> {
        let absolute = self.root.join(relative);
        if let Some(parent) = absolute.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(task)?;
        tokio::fs::write(&absolute, content).await?;
        Ok(())
    }

    async fn remove_file(&self, relative: &Path) -> Result<()> {
        let absolute = self.root.join(relative);
        match tokio::fs::remove_file(&absolute).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BoardError::Io(e)),
        }
    }

    /// Stage `paths` and commit `message`, unless `cancel` fires in the
    /// window between the two — in which case the stage is discarded via
    /// `Repository::reset_staged` and no commit is produced (spec's
    /// cancel-after-stage-before-commit rule; cancellation after commit is
    /// ignored).
    async fn stage_and_commit(
        &self,
        operation: &str,
        paths: Vec<PathBuf>,
        message: String,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.repository
            .stage(&paths)
            .await
            .map_err(|e| BoardError::repository("stage", e))?;

        if cancel.is_cancelled() {
            self.repository
                .reset_staged()
                .await
                .map_err(|e| BoardError::repository("reset_staged", e))?;
            return Err(BoardError::cancelled(operation));
        }

        self.repository
            .commit(&message)
            .await
            .map_err(|e| BoardError::repository("commit", e))?;
        self.invalidate_index().await;
        Ok(())
    }

    // ---- derivation ---------------------------------------------------

    /// `created_at` = oldest commit touching the file, `updated_at` =
    /// newest. Falls back to wall time when history is empty.
    async fn file_timestamps(&self, relative: &Path) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let history = self
            .repository
            .get_file_history(relative, HISTORY_LIMIT)
            .await
            .map_err(|e| BoardError::repository("get_file_history", e))?;

        match (history.first(), history.last()) {
            (Some(newest), Some(oldest)) => Ok((oldest.timestamp, newest.timestamp)),
            _ => {
                let now = Utc::now();
                Ok((now, now))
            }
        }
    }

    /// Derive the current priority of a task. In a sectioned column the
    /// section *is* the priority label (Invariant 2) — no history read
    /// needed. Outside a sectioned column (non-sectioned active columns,
    /// `archived`) the path carries nothing, so the latest `EisenKan-Priority`
    /// trailer in the file's history is authoritative.
    async fn derive_priority(
        &self,
        board: &BoardConfiguration,
        relative: &Path,
        status: &WorkflowStatus,
    ) -> Result<Priority> {
        if !status.is_archived() && board.is_sectioned(&status.column) {
            if let Some(section) = &status.section {
                if let Some(priority) = Priority::from_label(section) {
                    return Ok(priority);
                }
            }
        }

        let history = self
            .repository
            .get_file_history(relative, HISTORY_LIMIT)
            .await
            .map_err(|e| BoardError::repository("get_file_history", e))?;

        let label = history
            .iter()
            .find_map(|commit| commit.trailer(PRIORITY_TRAILER));

        match label.and_then(Priority::from_label) {
            Some(priority) => Ok(priority),
            // No trailer found (e.g. a file committed outside this core's
            // operations). Fall back to the one quadrant every path can
            // always express unambiguously: treat as urgent-important so
            // Invariant 3 ({false,false} is never reported) still holds.
            None => Ok(Priority::new(true, true)),
        }
    }

    fn commit_message(summary: &str, priority: Option<Priority>, mv: Option<(&str, &str)>) -> String {
        let mut message = summary.to_string();
        let mut trailers = Vec::new();
        if let Some(priority) = priority {
            trailers.push(format!("{PRIORITY_TRAILER}: {}", priority.label()));
        }
        if let Some((from, to)) = mv {
            trailers.push(format!("{MOVE_TRAILER}: {from}->{to}"));
        }
        if !trailers.is_empty() {
            message.push_str("\n\n");
            message.push_str(&trailers.join("\n"));
        }
        message
    }

    async fn build_view(
        &self,
        board: &BoardConfiguration,
        id: &TaskId,
        relative: &Path,
    ) -> Result<TaskView> {
        let task = self.read_task_body(id, relative).await?;
        let status = parse_task_path(relative).ok_or_else(|| {
            BoardError::repository(
                "parse_task_path",
                GitError::from_string(format!("cannot parse status from '{}'", relative.display())),
            )
        })?;
        let priority = self.derive_priority(board, relative, &status).await?;
        let (created_at, updated_at) = self.file_timestamps(relative).await?;
        Ok(TaskView {
            task,
            priority,
            status,
            created_at,
            updated_at,
        })
    }

    /// Every task on disk, with id, relative path, body, and status. Used by
    /// cascade discovery, query filtering, and WIP aggregation.
    async fn load_all(&self) -> Result<Vec<(TaskId, PathBuf, Task, WorkflowStatus)>> {
        let index = self.path_index().await?;
        let mut out = Vec::with_capacity(index.len());
        for (id, relative) in index {
            let task = self.read_task_body(&id, &relative).await?;
            let status = parse_task_path(&relative).ok_or_else(|| {
                BoardError::repository(
                    "parse_task_path",
                    GitError::from_string(format!("cannot parse status from '{}'", relative.display())),
                )
            })?;
            out.push((id, relative, task, status));
        }
        Ok(out)
    }

    fn next_position(existing: impl Iterator<Item = u32>) -> u32 {
        existing.max().map(|p| p + 1).unwrap_or(1)
    }

    async fn next_archived_position(&self) -> Result<u32> {
        let all = self.load_all().await?;
        Ok(Self::next_position(
            all.iter()
                .filter(|(_, _, _, status)| status.is_archived())
                .map(|(_, _, _, status)| status.position),
        ))
    }

    /// Reject `status` if any task *other than* `excluding` already occupies
    /// its `(column, section, position)` cell (Invariant 4). A task's file
    /// name embeds its id, so two different tasks at the same position
    /// resolve to two different file names — `Path::exists` on the resolved
    /// path can never see this collision, only a scan of the tasks actually
    /// at that column/section can.
    async fn check_position_available(&self, status: &WorkflowStatus, excluding: &TaskId) -> Result<()> {
        let all = self.load_all().await?;
        let occupied = all.iter().any(|(other_id, _, _, other_status)| {
            other_id != excluding
                && other_status.column == status.column
                && other_status.section == status.section
                && other_status.position == status.position
        });
        if occupied {
            return Err(BoardError::status_invalid(format!(
                "position {} in '{}' is already occupied",
                status.position, status.column
            )));
        }
        Ok(())
    }

    // ---- public contract -----------------------------------

    /// `create_task`
    pub async fn create_task(
        &self,
        board: &BoardConfiguration,
        mut task: Task,
        priority: Priority,
        status: WorkflowStatus,
        cancel: &CancellationToken,
    ) -> Result<TaskId> {
        if !task.title_is_valid() {
            return Err(BoardError::task_invalid("title must be non-empty"));
        }
        let priority = priority.validate()?;
        task.title = task.title.trim().to_string();

        let relative = resolve_path(board, &task.id, &status)?;
        self.check_position_available(&status, &task.id).await?;

        debug!(id = %task.id, column = %status.column, "creating task");
        self.write_task_body(&relative, &task).await?;

        let message = Self::commit_message(
            &format!("create task {}", task.id),
            Some(priority),
            Some(("none", &status.column)),
        );
        self.stage_and_commit("create_task", vec![relative], message, cancel)
            .await?;

        info!(id = %task.id, "created task");
        Ok(task.id)
    }

    /// `read_tasks` Ids with no on-disk file are silently
    /// omitted (the operation's error table lists no `NotFound`).
    pub async fn read_tasks(&self, board: &BoardConfiguration, ids: &[TaskId]) -> Result<Vec<TaskView>> {
        let mut views = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(relative) = self.find_task_path(id).await? {
                views.push(self.build_view(board, id, &relative).await?);
            }
        }
        Ok(views)
    }

    /// `list_ids`, hierarchy filter applied uniformly with
    /// `find_tasks`.
    pub async fn list_ids(&self, hierarchy: HierarchyFilter) -> Result<Vec<TaskId>> {
        let all = self.load_all().await?;
        let by_id: HashMap<&TaskId, &Task> = all.iter().map(|(id, _, task, _)| (id, task)).collect();
        Ok(all
            .iter()
            .filter(|(id, _, _, _)| matches_hierarchy(hierarchy, by_id[id]))
            .map(|(id, _, _, _)| id.clone())
            .collect())
    }

    /// `change_task_data` Path changes iff `new_status` differs
    /// from the task's current status; otherwise only the body is rewritten.
    pub async fn change_task_data(
        &self,
        board: &BoardConfiguration,
        id: &TaskId,
        mut new_task: Task,
        new_priority: Priority,
        new_status: WorkflowStatus,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if !new_task.title_is_valid() {
            return Err(BoardError::task_invalid("title must be non-empty"));
        }
        let new_priority = new_priority.validate()?;
        new_task.title = new_task.title.trim().to_string();
        new_task.id = id.clone();

        let old_relative = self
            .find_task_path(id)
            .await?
            .ok_or_else(|| BoardError::not_found("task", id.as_str()))?;
        let old_status = parse_task_path(&old_relative).ok_or_else(|| {
            BoardError::repository(
                "parse_task_path",
                GitError::from_string(format!("cannot parse status from '{}'", old_relative.display())),
            )
        })?;
        let new_relative = resolve_path(board, id, &new_status)?;

        if old_relative == new_relative {
            debug!(%id, "updating task body in place");
            self.write_task_body(&new_relative, &new_task).await?;
            let message = Self::commit_message(&format!("update task {id}"), Some(new_priority), None);
            self.stage_and_commit("change_task_data", vec![new_relative], message, cancel)
                .await?;
        } else {
            self.check_position_available(&new_status, id).await?;
            debug!(%id, from = %old_status.column, to = %new_status.column, "moving and updating task");
            self.remove_file(&old_relative).await?;
            self.write_task_body(&new_relative, &new_task).await?;
            let message = Self::commit_message(
                &format!("update task {id}"),
                Some(new_priority),
                Some((&old_status.column, &new_status.column)),
            );
            self.stage_and_commit("change_task_data", vec![old_relative, new_relative], message, cancel)
                .await?;
        }

        info!(%id, "updated task");
        Ok(())
    }

    /// `move_task` No-op (no commit) if the resolved path is
    /// unchanged.
    pub async fn move_task(
        &self,
        board: &BoardConfiguration,
        id: &TaskId,
        new_priority: Priority,
        new_status: WorkflowStatus,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let new_priority = new_priority.validate()?;
        let old_relative = self
            .find_task_path(id)
            .await?
            .ok_or_else(|| BoardError::not_found("task", id.as_str()))?;
        let old_status = parse_task_path(&old_relative).ok_or_else(|| {
            BoardError::repository(
                "parse_task_path",
                GitError::from_string(format!("cannot parse status from '{}'", old_relative.display())),
            )
        })?;
        let new_relative = resolve_path(board, id, &new_status)?;

        if old_relative == new_relative {
            debug!(%id, "move_task is a no-op: identical path");
            return Ok(());
        }

        self.check_position_available(&new_status, id).await?;

        let task = self.read_task_body(id, &old_relative).await?;
        debug!(%id, from = %old_status.column, to = %new_status.column, "moving task");
        self.remove_file(&old_relative).await?;
        self.write_task_body(&new_relative, &task).await?;

        let message = Self::commit_message(
            &format!("move task {id}"),
            Some(new_priority),
            Some((&old_status.column, &new_status.column)),
        );
        self.stage_and_commit("move_task", vec![old_relative, new_relative], message, cancel)
            .await?;

        info!(%id, "moved task");
        Ok(())
    }

    /// `archive_task` Allocates a fresh monotonic archive
    /// position, never reusing the task's prior
    /// position.
    pub async fn archive_task(
        &self,
        board: &BoardConfiguration,
        id: &TaskId,
        cascade: CascadePolicy,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.apply_cascade(board, id, cascade, cancel).await?;

        let old_relative = self
            .find_task_path(id)
            .await?
            .ok_or_else(|| BoardError::not_found("task", id.as_str()))?;
        let old_status = parse_task_path(&old_relative).ok_or_else(|| {
            BoardError::repository(
                "parse_task_path",
                GitError::from_string(format!("cannot parse status from '{}'", old_relative.display())),
            )
        })?;
        if old_status.is_archived() {
            debug!(%id, "archive_task is a no-op: already archived");
            return Ok(());
        }

        let position = self.next_archived_position().await?;
        let archived_status = WorkflowStatus::archived(position);
        let new_relative = resolve_path(board, id, &archived_status)?;

        let task = self.read_task_body(id, &old_relative).await?;
        debug!(%id, "archiving task");
        self.remove_file(&old_relative).await?;
        self.write_task_body(&new_relative, &task).await?;

        let message = Self::commit_message(
            &format!("archive task {id}"),
            None,
            Some((&old_status.column, ARCHIVED_COLUMN)),
        );
        self.stage_and_commit("archive_task", vec![old_relative, new_relative], message, cancel)
            .await?;

        info!(%id, "archived task");
        Ok(())
    }

    /// `remove_task` Idempotent: a missing id is success,
    /// producing no commit.
    pub async fn remove_task(
        &self,
        id: &TaskId,
        cascade: CascadePolicy,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if !matches!(cascade, CascadePolicy::None) {
            let board = self.cascade_board().await?;
            self.apply_cascade(&board, id, cascade, cancel).await?;
        }

        let Some(relative) = self.find_task_path(id).await? else {
            debug!(%id, "remove_task is a no-op: task already absent");
            return Ok(());
        };

        debug!(%id, "removing task");
        self.remove_file(&relative).await?;
        self.stage_and_commit("remove_task", vec![relative], format!("remove task {id}"), cancel)
            .await?;

        info!(%id, "removed task");
        Ok(())
    }

    async fn apply_cascade(
        &self,
        board: &BoardConfiguration,
        id: &TaskId,
        cascade: CascadePolicy,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if matches!(cascade, CascadePolicy::None) {
            return Ok(());
        }

        let children: Vec<TaskId> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|(_, _, task, _)| task.parent_task_id.as_ref() == Some(id))
            .map(|(child_id, _, _, _)| child_id)
            .collect();

        for child in children {
            match cascade {
                CascadePolicy::None => unreachable!(),
                CascadePolicy::ArchiveChildren => {
                    Box::pin(self.archive_task(board, &child, cascade, cancel)).await?;
                }
                CascadePolicy::DeleteChildren => {
                    Box::pin(self.remove_task(&child, cascade, cancel)).await?;
                }
                CascadePolicy::PromoteChildren => {
                    self.clear_parent(&child, cancel).await?;
                }
            }
        }

        Ok(())
    }

    /// `remove_task`'s public contract takes no `BoardConfiguration` (the
    /// operation doesn't need one to delete a file it already has the path
    /// for), but an `archive-children` cascade recursing from a removal does
    /// need one to resolve the `archived/` destination path. Read it lazily,
    /// only when that cascade policy is actually in play.
    async fn cascade_board(&self) -> Result<BoardConfiguration> {
        let absolute = self.root.join(crate::paths::BOARD_FILE);
        if !absolute.exists() {
            return Ok(BoardConfiguration::default_board());
        }
        let content = tokio::fs::read_to_string(&absolute).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn clear_parent(&self, id: &TaskId, cancel: &CancellationToken) -> Result<()> {
        let Some(relative) = self.find_task_path(id).await? else {
            return Ok(());
        };
        let mut task = self.read_task_body(id, &relative).await?;
        if task.parent_task_id.is_none() {
            return Ok(());
        }
        task.parent_task_id = None;
        self.write_task_body(&relative, &task).await?;
        self.stage_and_commit("promote_children", vec![relative], format!("promote task {id}"), cancel)
            .await?;
        Ok(())
    }

    /// `find_tasks`
    pub async fn find_tasks(&self, board: &BoardConfiguration, criteria: &QueryCriteria) -> Result<Vec<TaskView>> {
        let all = self.load_all().await?;
        let mut views = Vec::new();
        for (id, relative, task, status) in &all {
            if !matches_hierarchy(criteria.hierarchy, task) {
                continue;
            }
            if let Some(archived) = criteria.archived {
                if status.is_archived() != archived {
                    continue;
                }
            }
            if let Some(columns) = &criteria.columns {
                if !columns.contains(&status.column) {
                    continue;
                }
            }
            if let Some(sections) = &criteria.sections {
                match &status.section {
                    Some(section) if sections.contains(section) => {}
                    _ => continue,
                }
            }
            if let Some(parent) = &criteria.parent_task_id {
                if task.parent_task_id.as_ref() != Some(parent) {
                    continue;
                }
            }
            if !criteria.tags.is_empty() {
                let tags: BTreeSet<&String> = task.tags.iter().collect();
                if !criteria.tags.iter().all(|t| tags.contains(t)) {
                    continue;
                }
            }

            let priority = self.derive_priority(board, relative, status).await?;
            if let Some(wanted) = criteria.priority {
                if priority != wanted {
                    continue;
                }
            }

            let (created_at, updated_at) = self.file_timestamps(relative).await?;
            if let Some((field, range)) = &criteria.date_range {
                let when = match field {
                    crate::types::DateField::CreatedAt => created_at,
                    crate::types::DateField::UpdatedAt => updated_at,
                };
                if !range.contains(when) {
                    continue;
                }
            }

            views.push(TaskView {
                task: task.clone(),
                priority,
                status: status.clone(),
                created_at,
                updated_at,
            });
        }

        Ok(views)
    }

    /// `get_task_history`
    pub async fn get_task_history(&self, id: &TaskId, limit: usize) -> Result<Vec<Commit>> {
        let relative = self
            .find_task_path(id)
            .await?
            .ok_or_else(|| BoardError::not_found("task", id.as_str()))?;
        self.repository
            .get_file_history(&relative, limit)
            .await
            .map_err(|e| BoardError::repository("get_file_history", e))
    }
}

/// Shared hierarchy predicate: applied identically
/// by `list_ids` and `find_tasks`.
fn matches_hierarchy(hierarchy: HierarchyFilter, task: &Task) -> bool {
    match hierarchy {
        HierarchyFilter::All => true,
        HierarchyFilter::TopLevelOnly => task.parent_task_id.is_none(),
        HierarchyFilter::SubtasksOnly => task.parent_task_id.is_some(),
    }
}
