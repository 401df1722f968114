//! Structural checks and repairs for flow documents.

use std::collections::HashSet;
use std::fmt;

use crate::flow::{Flow, Step};
use crate::link::step_id;

/// Title given to flows that arrive without one.
pub const UNTITLED_FLOW: &str = "無題のフロー";

/// A structural problem found in a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptySteps,
    EmptyStepId { position: usize },
    DuplicateStepId(String),
    /// A decision that does not carry exactly four options.
    OptionCount { step_id: String, count: usize },
    /// An option whose `nextStepId` names no step of the flow.
    DanglingTarget { step_id: String, target: String },
    BodyMismatch(String),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySteps => write!(f, "flow has no steps"),
            Self::EmptyStepId { position } => write!(f, "step at position {} has no id", position),
            Self::DuplicateStepId(id) => write!(f, "step id '{}' is used more than once", id),
            Self::OptionCount { step_id, count } => {
                write!(f, "decision '{}' has {} options, expected 4", step_id, count)
            }
            Self::DanglingTarget { step_id, target } => {
                write!(f, "decision '{}' links to unknown step '{}'", step_id, target)
            }
            Self::BodyMismatch(id) => {
                write!(f, "step '{}' has description and message out of sync", id)
            }
        }
    }
}

/// Lists every structural issue of `flow`. An empty list means the flow is well formed.
pub fn validate_flow(flow: &Flow) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if flow.steps.is_empty() {
        issues.push(ValidationIssue::EmptySteps);
    }

    let mut seen = HashSet::new();
    for (position, step) in flow.steps.iter().enumerate() {
        if step.id.is_empty() {
            issues.push(ValidationIssue::EmptyStepId { position });
        } else if !seen.insert(step.id.as_str()) {
            issues.push(ValidationIssue::DuplicateStepId(step.id.clone()));
        }
        if step.description != step.message {
            issues.push(ValidationIssue::BodyMismatch(step.id.clone()));
        }
    }

    for step in flow.steps.iter().filter(|s| s.is_decision()) {
        if !step.has_full_option_set() {
            issues.push(ValidationIssue::OptionCount {
                step_id: step.id.clone(),
                count: step.options.len(),
            });
        }
        for option in &step.options {
            if !seen.contains(option.next_step_id.as_str()) {
                issues.push(ValidationIssue::DanglingTarget {
                    step_id: step.id.clone(),
                    target: option.next_step_id.clone(),
                });
            }
        }
    }

    issues
}

/// Fills the gaps a hand-edited or imported document tends to have.
///
/// Never touches option targets, images or ordering.
pub fn auto_fix_flow(flow: &mut Flow) {
    if flow.title.trim().is_empty() {
        flow.title = UNTITLED_FLOW.to_string();
    }
    for (position, step) in flow.steps.iter_mut().enumerate() {
        auto_fix_step(step, position);
    }
}

/// Per-step repairs: id, title, and description/message sync.
pub fn auto_fix_step(step: &mut Step, position: usize) {
    if step.id.trim().is_empty() {
        step.id = step_id(position);
    }
    if step.title.trim().is_empty() {
        step.title = format!("ステップ {}", position + 1);
    }
    if step.description.is_empty() {
        step.description = step.message.clone();
    }
    step.message = step.description.clone();
    for option in &mut step.options {
        if option.condition.is_empty() {
            option.condition = option.text.clone();
        }
    }
}
