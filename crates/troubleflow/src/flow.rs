//! The flow document: steps, decision options, image attachments and edit history.
//!
//! Field names serialize in camelCase so persisted documents stay readable by
//! the dashboard. Keys this model does not know about are kept in the
//! flattened `extra` maps and survive a load / merge / save cycle untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::config::DECISION_OPTION_COUNT;

/// A complete troubleshooting procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    /// Generated once at creation, never reassigned.
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub trigger_keywords: Vec<String>,
    /// Order is the default traversal order and the basis of initial branch links.
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Append-only; only the merge engine writes here.
    #[serde(default, deserialize_with = "null_as_default")]
    pub update_history: Vec<UpdateHistoryEntry>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Flow {
    /// Looks up a step by id.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Position of the step with the given id.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    /// Quick content indicators for the dashboard.
    pub fn summary(&self) -> FlowSummary {
        let mentions = |words: &[&str]| {
            self.steps
                .iter()
                .any(|s| words.iter().any(|w| s.description.contains(w)))
        };

        FlowSummary {
            total_steps: self.steps.len(),
            decision_steps: self.steps.iter().filter(|s| s.is_decision()).count(),
            has_specific_actions: mentions(&["確認", "点検", "測定", "調整"]),
            safety_notes: mentions(&["安全", "危険", "停止"]),
        }
    }
}

/// Content indicators computed from a flow's step bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSummary {
    pub total_steps: usize,
    pub decision_steps: usize,
    /// Some step asks for a concrete check, inspection, measurement or adjustment.
    pub has_specific_actions: bool,
    /// Some step mentions safety, danger or stopping the machine.
    pub safety_notes: bool,
}

/// Node kind. Legacy documents use `start`/`end`/`condition`; they are read
/// as their closest kind and written back canonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    #[default]
    #[serde(alias = "start", alias = "end")]
    Step,
    #[serde(alias = "condition")]
    Decision,
}

/// A node of the flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// `step_<n>`, unique within the flow.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Display alias of `description`; the two are kept equal.
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: StepKind,
    /// Legacy single-image field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<ImageRef>,
    /// Empty for plain steps; exactly four for synthesized decisions.
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<DecisionOption>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Step {
    /// Creates a plain step. The id is assigned later by the linker.
    pub fn plain(title: impl Into<String>, description: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            id: String::new(),
            title: title.into(),
            message: description.clone(),
            description,
            kind: StepKind::Step,
            image_url: None,
            images: Vec::new(),
            options: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Creates a decision step with the given (unlinked) options.
    pub fn decision(
        title: impl Into<String>,
        description: impl Into<String>,
        options: Vec<DecisionOption>,
    ) -> Self {
        Self {
            kind: StepKind::Decision,
            options,
            ..Self::plain(title, description)
        }
    }

    pub fn is_decision(&self) -> bool {
        self.kind == StepKind::Decision
    }

    /// Replaces the body, keeping `message` in sync.
    pub fn set_body(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.message = self.description.clone();
    }

    /// True when the decision carries the full set of four options.
    pub fn has_full_option_set(&self) -> bool {
        self.options.len() == DECISION_OPTION_COUNT
    }
}

/// Positional classification of a decision option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionType {
    Yes,
    No,
    Maybe,
    #[default]
    Other,
}

impl ConditionType {
    /// Condition type of option slot `index` (0→yes, 1→no, 2→maybe, 3→other).
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => ConditionType::Yes,
            1 => ConditionType::No,
            2 => ConditionType::Maybe,
            _ => ConditionType::Other,
        }
    }
}

/// One branch choice of a decision step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOption {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    /// Empty until the linker resolves it.
    #[serde(default, deserialize_with = "null_as_default")]
    pub next_step_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_terminal: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub condition_type: ConditionType,
    /// Echo of `text`, kept for older readers.
    #[serde(default, deserialize_with = "null_as_default")]
    pub condition: String,
}

impl DecisionOption {
    /// Creates the option for slot `index` with an unresolved target.
    pub fn at(index: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            condition: text.clone(),
            text,
            next_step_id: String::new(),
            is_terminal: false,
            condition_type: ConditionType::from_index(index),
        }
    }
}

/// An image attached to a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_name: String,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl ImageRef {
    pub fn new(url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: file_name.into(),
            extra: Map::new(),
        }
    }
}

/// Audit record appended by every merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub updated_fields: Vec<String>,
    pub updated_by: String,
}

/// Reads an explicit JSON `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
