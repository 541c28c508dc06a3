//! Core data types for the board engine.

mod board_config;
mod ids;
mod priority;
mod query;
mod rules;
mod status;
mod task;

pub use board_config::{BoardConfiguration, ALLOWED_PRIORITY_LABELS};
pub use ids::TaskId;
pub use priority::Priority;
pub use query::{CascadePolicy, DateField, DateRange, HierarchyFilter, QueryCriteria};
pub use rules::{
    EffectRequest, EvaluationResult, ProposedTransition, Rule, RuleCategory, RuleSet, RulesData,
    ValidationResult, Violation,
};
pub use status::{WorkflowStatus, ARCHIVED_COLUMN};
pub use task::{Task, TaskView};
