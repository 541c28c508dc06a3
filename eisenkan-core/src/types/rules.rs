//! Rule set and rule-evaluation types.

use super::ids::TaskId;
use super::task::TaskView;
use eisenkan_git::Commit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The category a rule belongs to; constrains what it may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Validation,
    Workflow,
    Automation,
    Notification,
}

impl RuleCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Workflow => "workflow",
            Self::Automation => "automation",
            Self::Notification => "notification",
        }
    }
}

/// A single declarative rule. `conditions`/`actions` are structured maps
/// interpreted by the [`crate::rule_evaluator`] against a fixed vocabulary
/// of known keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub category: RuleCategory,
    pub trigger_type: String,
    #[serde(default)]
    pub conditions: BTreeMap<String, Value>,
    #[serde(default)]
    pub actions: BTreeMap<String, Value>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

/// `{version, rules[], dependencies: rule-id->[rule-id], metadata}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    pub version: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl RuleSet {
    pub fn empty() -> Self {
        Self {
            version: "1.0".to_string(),
            rules: Vec::new(),
            dependencies: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }
}

/// Result of [`crate::rules_store::validate_rule_changes`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Read-only snapshot assembled by the [`crate::rules_aggregator`] and
/// consumed by the [`crate::rule_evaluator`]. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct RulesData {
    pub wip_counts: BTreeMap<String, usize>,
    pub column_tasks: BTreeMap<String, Vec<TaskView>>,
    pub task_history: Vec<Commit>,
    pub column_enter_times: BTreeMap<String, DateTime<Utc>>,
    pub board_metadata: BTreeMap<String, String>,
}

/// A proposed state change submitted to the evaluator.
#[derive(Debug, Clone, Serialize)]
pub struct ProposedTransition {
    pub task_id: TaskId,
    pub from: super::status::WorkflowStatus,
    pub to: super::status::WorkflowStatus,
    pub new_priority: super::priority::Priority,
}

/// A rule that rejected a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub rule_id: String,
    pub message: String,
}

/// A deferred side-effect collected from a rule's `actions`, dispatched by
/// `BoardService` only after a successful commit.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectRequest {
    pub rule_id: String,
    pub action: String,
    pub parameters: BTreeMap<String, Value>,
}

/// Output of [`crate::rule_evaluator::evaluate`].
#[derive(Debug, Clone, Default)]
pub struct EvaluationResult {
    pub permitted: bool,
    pub violations: Vec<Violation>,
    pub effects: Vec<EffectRequest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ruleset_has_version() {
        let set = RuleSet::empty();
        assert_eq!(set.version, "1.0");
        assert!(set.rules.is_empty());
    }
}
