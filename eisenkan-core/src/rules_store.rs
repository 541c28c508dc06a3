//! `RulesStore` — reads, validates, and writes the board's rule set.

use crate::error::{BoardError, Result};
use crate::paths::RULES_FILE;
use crate::types::{RuleCategory, RuleSet, ValidationResult};
use eisenkan_git::Repository;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub struct RulesStore {
    root: PathBuf,
    repository: Arc<dyn Repository>,
}

impl RulesStore {
    pub fn new(root: impl Into<PathBuf>, repository: Arc<dyn Repository>) -> Self {
        Self {
            root: root.into(),
            repository,
        }
    }

    /// Absent `rules.json` yields an empty rule set at `version=1.0`.
    pub async fn read_rules(&self) -> Result<RuleSet> {
        let path = self.root.join(RULES_FILE);
        if !path.exists() {
            debug!("rules.json absent, returning empty rule set");
            return Ok(RuleSet::empty());
        }
        let content = tokio::fs::read_to_string(&path).await?;
        let set: RuleSet = serde_json::from_str(&content)?;
        Ok(set)
    }

    /// Structural validation; pure, no I/O.
    pub fn validate_rule_changes(&self, set: &RuleSet) -> ValidationResult {
        let mut result = ValidationResult::ok();

        if set.version.trim().is_empty() {
            result.errors.push("rule set version must be non-empty".to_string());
        }

        let mut seen_ids = HashSet::new();
        for rule in &set.rules {
            if rule.id.trim().is_empty() {
                result.errors.push("rule id must be non-empty".to_string());
            }
            if rule.name.trim().is_empty() {
                result
                    .errors
                    .push(format!("rule '{}' has an empty name", rule.id));
            }
            if rule.trigger_type.trim().is_empty() {
                result
                    .errors
                    .push(format!("rule '{}' has an empty trigger_type", rule.id));
            }
            if rule.conditions.is_empty() {
                result
                    .errors
                    .push(format!("rule '{}' has no conditions", rule.id));
            }
            if rule.actions.is_empty() {
                result
                    .errors
                    .push(format!("rule '{}' has no actions", rule.id));
            }
            if !matches!(
                rule.category,
                RuleCategory::Validation
                    | RuleCategory::Workflow
                    | RuleCategory::Automation
                    | RuleCategory::Notification
            ) {
                result
                    .errors
                    .push(format!("rule '{}' has an unrecognized category", rule.id));
            }

            if !seen_ids.insert(rule.id.clone()) {
                result
                    .errors
                    .push(format!("duplicate rule id: '{}'", rule.id));
            }
        }

        let known_ids: HashSet<&str> = set.rules.iter().map(|r| r.id.as_str()).collect();
        for (from, deps) in &set.dependencies {
            if !known_ids.contains(from.as_str()) {
                result
                    .errors
                    .push(format!("dependency key '{from}' references an unknown rule"));
            }
            for dep in deps {
                if !known_ids.contains(dep.as_str()) {
                    result.errors.push(format!(
                        "rule '{from}' depends on unknown rule '{dep}'"
                    ));
                }
            }
        }

        if let Some(cycle_member) = find_cycle(&set.dependencies) {
            result
                .errors
                .push(format!("dependency cycle detected involving rule '{cycle_member}'"));
        }

        result.valid = result.errors.is_empty();
        result
    }

    /// Validate, then write and commit.
    pub async fn change_rules(&self, set: RuleSet) -> Result<()> {
        let validation = self.validate_rule_changes(&set);
        if !validation.valid {
            return Err(BoardError::rule_set_invalid(validation.errors.join("; ")));
        }

        let path = self.root.join(RULES_FILE);
        let content = serde_json::to_string_pretty(&set)?;
        tokio::fs::write(&path, content).await?;

        self.repository
            .stage(&[PathBuf::from(RULES_FILE)])
            .await
            .map_err(|e| BoardError::repository("stage", e))?;
        self.repository
            .commit("update rule set")
            .await
            .map_err(|e| BoardError::repository("commit", e))?;

        info!(rule_count = set.rules.len(), "updated rule set");
        Ok(())
    }
}

/// DFS with a recursion stack: any back-edge is a cycle. Returns one
/// participating rule id, if a cycle exists.
fn find_cycle(dependencies: &std::collections::BTreeMap<String, Vec<String>>) -> Option<String> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    let mut marks: HashMap<&str, Mark> = HashMap::new();

    fn visit<'a>(
        node: &'a str,
        dependencies: &'a std::collections::BTreeMap<String, Vec<String>>,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> Option<String> {
        match marks.get(node) {
            Some(Mark::Done) => return None,
            Some(Mark::Visiting) => return Some(node.to_string()),
            None => {}
        }

        marks.insert(node, Mark::Visiting);
        if let Some(deps) = dependencies.get(node) {
            for dep in deps {
                if let Some(cycle) = visit(dep.as_str(), dependencies, marks) {
                    return Some(cycle);
                }
            }
        }
        marks.insert(node, Mark::Done);
        None
    }

    for node in dependencies.keys() {
        if let Some(cycle) = visit(node.as_str(), dependencies, &mut marks) {
            return Some(cycle);
        }
    }
    None
}
