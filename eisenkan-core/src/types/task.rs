//! `Task` — the body stored in each task file.

use super::ids::TaskId;
use super::priority::Priority;
use super::status::WorkflowStatus;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use serde::{Deserialize, Serialize};

/// The on-disk task body. Carries **no** column, section, position, or
/// priority — those are derived from the file's path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(skip)]
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<TaskId>,
    /// Free-form string metadata. Reserved key `priority_promotion_date`
    /// round-trips here uninterpreted.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into(),
            description: String::new(),
            tags: BTreeSet::new(),
            due_date: None,
            parent_task_id: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Non-empty, trimmed title.
    pub fn title_is_valid(&self) -> bool {
        !self.title.trim().is_empty()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn with_parent(mut self, parent: TaskId) -> Self {
        self.parent_task_id = Some(parent);
        self
    }
}

/// A fully materialized task: body plus everything derived from its path
/// and history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub priority: Priority,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
