//! `RuleEvaluator` — the pure transition-permission function.
//!
//! Stateless: given a proposed transition, the board's `RuleSet`, and a
//! `RulesData` snapshot, decide whether the transition is permitted and
//! collect the side effects it would trigger. Never mutates state and never
//! dispatches an effect itself — `BoardService` does that, and only after a
//! successful commit.

use crate::types::{EffectRequest, EvaluationResult, ProposedTransition, Rule, RuleCategory, RulesData, RuleSet, Violation};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// The kind of change a [`ProposedTransition`] represents, used to match
/// against a rule's `trigger_type`.
fn transition_kind(transition: &ProposedTransition) -> &'static str {
    if transition.from.column != transition.to.column {
        "task_transition"
    } else {
        "status_change"
    }
}

/// A rule's `trigger_type` matches a transition when it names the
/// transition's own kind, or names `due_date` — due-date rules are
/// orthogonal to column/priority movement and are always in scope.
fn trigger_matches(rule: &Rule, kind: &str) -> bool {
    rule.trigger_type == kind || rule.trigger_type == "due_date"
}

enum Outcome {
    /// Conditions did not all hold: the rule simply does not apply here.
    NotTriggered,
    /// All known conditions held.
    Triggered,
    /// A condition key the evaluator doesn't recognize was present.
    Inapplicable(String),
}

/// Evaluate every eligible rule against `transition`, in ascending
/// `priority` order (ties broken by id, lexicographically), and return the
/// aggregate permit decision plus any collected effects.
pub fn evaluate(transition: &ProposedTransition, rules: &RuleSet, data: &RulesData) -> EvaluationResult {
    let kind = transition_kind(transition);

    let mut eligible: Vec<&Rule> = rules
        .rules
        .iter()
        .filter(|r| r.enabled && trigger_matches(r, kind))
        .collect();
    eligible.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));

    let mut violations = Vec::new();
    let mut effects = Vec::new();

    for rule in eligible {
        match evaluate_conditions(rule, transition, data) {
            Outcome::NotTriggered => {}
            Outcome::Inapplicable(reason) => {
                warn!(rule_id = %rule.id, reason, "rule has an unrecognized condition key; treated as inapplicable");
            }
            Outcome::Triggered => {
                if rule.category == RuleCategory::Validation {
                    violations.push(Violation {
                        rule_id: rule.id.clone(),
                        message: rule_message(rule),
                    });
                } else {
                    effects.extend(collect_effects(rule));
                }
            }
        }
    }

    EvaluationResult {
        permitted: violations.is_empty(),
        violations,
        effects,
    }
}

fn rule_message(rule: &Rule) -> String {
    rule.actions
        .get("message")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("rule '{}' denied this transition", rule.name))
}

fn collect_effects(rule: &Rule) -> Vec<EffectRequest> {
    rule.actions
        .iter()
        .map(|(action, value)| {
            let parameters = match value {
                Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                other => BTreeMap::from([("value".to_string(), other.clone())]),
            };
            EffectRequest {
                rule_id: rule.id.clone(),
                action: action.clone(),
                parameters,
            }
        })
        .collect()
}

/// Interpret `rule.conditions` against the fixed vocabulary of known keys:
/// column predicates, WIP comparisons, age thresholds, priority predicates.
/// All present known keys must hold for the rule to be triggered.
fn evaluate_conditions(rule: &Rule, transition: &ProposedTransition, data: &RulesData) -> Outcome {
    let mut triggered = true;

    for (key, value) in &rule.conditions {
        let holds = match key.as_str() {
            "to_column" => value.as_str().map(|v| v == transition.to.column),
            "from_column" => value.as_str().map(|v| v == transition.from.column),
            "wip_at_least" => wip_at_least(value, transition, data),
            "column_age_at_least_seconds" => column_age_at_least(value, transition, data),
            "priority_equals" => priority_equals(value, transition),
            "priority_label" => value
                .as_str()
                .map(|label| label == transition.new_priority.label()),
            _ => return Outcome::Inapplicable(key.clone()),
        };

        match holds {
            Some(true) => {}
            Some(false) => triggered = false,
            None => return Outcome::Inapplicable(format!("{key} has a malformed value")),
        }
    }

    if triggered {
        Outcome::Triggered
    } else {
        Outcome::NotTriggered
    }
}

fn wip_at_least(value: &Value, transition: &ProposedTransition, data: &RulesData) -> Option<bool> {
    let obj = value.as_object()?;
    let column = obj.get("column").and_then(Value::as_str).unwrap_or(&transition.to.column);
    let threshold = obj.get("count")?.as_u64()? as usize;
    let count = data.wip_counts.get(column).copied().unwrap_or(0);
    Some(count >= threshold)
}

fn column_age_at_least(value: &Value, transition: &ProposedTransition, data: &RulesData) -> Option<bool> {
    let obj = value.as_object()?;
    let column = obj.get("column").and_then(Value::as_str).unwrap_or(&transition.from.column);
    let seconds = obj.get("seconds")?.as_i64()?;
    let entered = data.column_enter_times.get(column)?;
    let age = Utc::now().signed_duration_since(*entered).num_seconds();
    Some(age >= seconds)
}

fn priority_equals(value: &Value, transition: &ProposedTransition) -> Option<bool> {
    let obj = value.as_object()?;
    let urgent = obj.get("urgent")?.as_bool()?;
    let important = obj.get("important")?.as_bool()?;
    Some(transition.new_priority.urgent == urgent && transition.new_priority.important == important)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Priority, WorkflowStatus};
    use std::collections::BTreeMap as Map;

    fn transition(from_col: &str, to_col: &str) -> ProposedTransition {
        ProposedTransition {
            task_id: crate::types::TaskId::from_string("X"),
            from: WorkflowStatus::new(from_col, None, 1),
            to: WorkflowStatus::new(to_col, None, 1),
            new_priority: Priority::new(true, true),
        }
    }

    fn rule(id: &str, category: RuleCategory, conditions: Map<String, Value>) -> Rule {
        let mut actions = Map::new();
        actions.insert("log".to_string(), serde_json::json!(true));
        Rule {
            id: id.to_string(),
            name: id.to_string(),
            category,
            trigger_type: "task_transition".to_string(),
            conditions,
            actions,
            priority: 0,
            enabled: true,
            metadata: Map::new(),
        }
    }

    #[test]
    fn test_wip_limit_denies_transition() {
        let mut conditions = Map::new();
        conditions.insert("wip_at_least".to_string(), serde_json::json!({"column": "doing", "count": 2}));
        let set = RuleSet {
            version: "1.0".to_string(),
            rules: vec![rule("wip-cap", RuleCategory::Validation, conditions)],
            dependencies: Map::new(),
            metadata: Map::new(),
        };

        let mut data = RulesData::default();
        data.wip_counts.insert("doing".to_string(), 2);

        let result = evaluate(&transition("todo", "doing"), &set, &data);
        assert!(!result.permitted);
        assert_eq!(result.violations[0].rule_id, "wip-cap");
    }

    #[test]
    fn test_unmet_condition_does_not_deny() {
        let mut conditions = Map::new();
        conditions.insert("wip_at_least".to_string(), serde_json::json!({"column": "doing", "count": 5}));
        let set = RuleSet {
            version: "1.0".to_string(),
            rules: vec![rule("wip-cap", RuleCategory::Validation, conditions)],
            dependencies: Map::new(),
            metadata: Map::new(),
        };

        let mut data = RulesData::default();
        data.wip_counts.insert("doing".to_string(), 1);

        let result = evaluate(&transition("todo", "doing"), &set, &data);
        assert!(result.permitted);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_unknown_condition_key_is_inapplicable_not_denied() {
        let mut conditions = Map::new();
        conditions.insert("some_future_key".to_string(), serde_json::json!(true));
        let set = RuleSet {
            version: "1.0".to_string(),
            rules: vec![rule("future", RuleCategory::Validation, conditions)],
            dependencies: Map::new(),
            metadata: Map::new(),
        };

        let result = evaluate(&transition("todo", "doing"), &set, &RulesData::default());
        assert!(result.permitted);
    }

    #[test]
    fn test_non_validation_rule_produces_effect_not_violation() {
        let mut conditions = Map::new();
        conditions.insert("to_column".to_string(), serde_json::json!("doing"));
        let set = RuleSet {
            version: "1.0".to_string(),
            rules: vec![rule("notify", RuleCategory::Notification, conditions)],
            dependencies: Map::new(),
            metadata: Map::new(),
        };

        let result = evaluate(&transition("todo", "doing"), &set, &RulesData::default());
        assert!(result.permitted);
        assert_eq!(result.effects.len(), 1);
        assert_eq!(result.effects[0].rule_id, "notify");
    }

    #[test]
    fn test_disabled_rule_never_triggers() {
        let mut conditions = Map::new();
        conditions.insert("to_column".to_string(), serde_json::json!("doing"));
        let mut r = rule("disabled", RuleCategory::Validation, conditions);
        r.enabled = false;
        let set = RuleSet {
            version: "1.0".to_string(),
            rules: vec![r],
            dependencies: Map::new(),
            metadata: Map::new(),
        };

        let result = evaluate(&transition("todo", "doing"), &set, &RulesData::default());
        assert!(result.permitted);
    }

    #[test]
    fn test_evaluation_order_is_priority_then_id() {
        let mut conditions = Map::new();
        conditions.insert("to_column".to_string(), serde_json::json!("doing"));
        let mut low = rule("b-low", RuleCategory::Validation, conditions.clone());
        low.priority = 5;
        let mut high = rule("a-high", RuleCategory::Validation, conditions);
        high.priority = 1;

        let set = RuleSet {
            version: "1.0".to_string(),
            rules: vec![low, high],
            dependencies: Map::new(),
            metadata: Map::new(),
        };

        let result = evaluate(&transition("todo", "doing"), &set, &RulesData::default());
        // Both deny; the first violation reported is the lowest-priority-number rule.
        assert_eq!(result.violations[0].rule_id, "a-high");
    }
}
