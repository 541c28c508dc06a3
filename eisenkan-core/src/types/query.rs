//! Query and cascade vocabulary for `BoardStore`.

use super::ids::TaskId;
use super::priority::Priority;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Hierarchy filter shared by `list_ids` and `find_tasks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HierarchyFilter {
    #[default]
    All,
    TopLevelOnly,
    SubtasksOnly,
}

/// What happens to a task's subtasks when it is archived or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CascadePolicy {
    #[default]
    None,
    ArchiveChildren,
    DeleteChildren,
    PromoteChildren,
}

/// A date range filter over either `created_at` or `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, when: DateTime<Utc>) -> bool {
        self.from.map(|f| when >= f).unwrap_or(true) && self.to.map(|t| when <= t).unwrap_or(true)
    }
}

/// Which timestamp a [`DateRange`] filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    CreatedAt,
    UpdatedAt,
}

/// Criteria for `find_tasks`. Every field defaults to "match everything".
#[derive(Debug, Clone, Default)]
pub struct QueryCriteria {
    pub columns: Option<BTreeSet<String>>,
    pub sections: Option<BTreeSet<String>>,
    pub priority: Option<Priority>,
    pub tags: BTreeSet<String>,
    pub date_range: Option<(DateField, DateRange)>,
    pub archived: Option<bool>,
    pub hierarchy: HierarchyFilter,
    pub parent_task_id: Option<TaskId>,
}

impl QueryCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }

    pub fn with_columns(mut self, columns: impl IntoIterator<Item = String>) -> Self {
        self.columns = Some(columns.into_iter().collect());
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn with_hierarchy(mut self, hierarchy: HierarchyFilter) -> Self {
        self.hierarchy = hierarchy;
        self
    }
}
