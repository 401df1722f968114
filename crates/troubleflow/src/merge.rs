//! Non-destructive application of partial edits to a persisted flow.
//!
//! An update document has the shape of a flow with any subset of keys. Absent
//! keys leave the stored value alone; an explicit `null` replaces it. The
//! document is classified into [`Patch`] values first, then merged:
//!
//! - objects merge recursively onto the stored object (or onto `{}`)
//! - the top-level `steps` array merges step by step, matched on `id`; a
//!   matched step keeps its stored images unless the update brings usable
//!   images of its own
//! - everything else replaces the stored value
//!
//! Every merge stamps `updatedAt` and appends one history entry listing the
//! update's keys in payload order. Branch targets are never recomputed.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::FlowError;
use crate::flow::{Flow, Step, UpdateHistoryEntry};
use crate::images::ImageValidator;
use crate::link::step_id;
use crate::validate::auto_fix_step;

/// Top-level keys owned by the engine; their values in an update are ignored.
const ENGINE_OWNED_KEYS: [&str; 2] = ["updateHistory", "updatedAt"];

/// A classified update value.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Replaces the stored value outright (scalars and ordinary arrays).
    Primitive(JsonValue),
    /// Merges key by key onto the stored object.
    Object(Vec<(String, Patch)>),
    /// The flow's step array, merged by step id.
    Steps(Vec<Map<String, JsonValue>>),
}

impl Patch {
    fn nested(value: JsonValue) -> Patch {
        match value {
            JsonValue::Object(map) => Patch::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Patch::nested(v)))
                    .collect(),
            ),
            other => Patch::Primitive(other),
        }
    }
}

/// A parsed, classified partial update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateDocument {
    entries: Vec<(String, Patch)>,
}

impl UpdateDocument {
    /// Classifies a raw update. Fails when it is not an object, when `steps`
    /// is neither an array nor `null`, or when a step entry is not an object.
    pub fn parse(update: JsonValue) -> Result<Self, FlowError> {
        let JsonValue::Object(map) = update else {
            return Err(FlowError::InvalidUpdate(
                "update must be a JSON object".to_string(),
            ));
        };

        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map {
            if key == "steps" {
                match value {
                    JsonValue::Null => entries.push((key, Patch::Primitive(JsonValue::Null))),
                    JsonValue::Array(items) => {
                        let steps = items
                            .into_iter()
                            .enumerate()
                            .map(|(i, item)| match item {
                                JsonValue::Object(step) => Ok(step),
                                _ => Err(FlowError::invalid_step_entry(i, "expected an object")),
                            })
                            .collect::<Result<Vec<_>, _>>()?;
                        entries.push((key, Patch::Steps(steps)));
                    }
                    _ => {
                        return Err(FlowError::InvalidUpdate(
                            "steps must be an array".to_string(),
                        ));
                    }
                }
            } else if key == "id" {
                entries.push((key, Patch::Primitive(value)));
            } else {
                entries.push((key, Patch::nested(value)));
            }
        }

        Ok(Self { entries })
    }

    /// Names of the top-level keys this update sets.
    pub fn field_names(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn id(&self) -> Option<&JsonValue> {
        self.entries.iter().find_map(|(k, p)| match p {
            Patch::Primitive(v) if k == "id" => Some(v),
            _ => None,
        })
    }
}

impl TryFrom<JsonValue> for UpdateDocument {
    type Error = FlowError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// The single mutation entry point for persisted flows.
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    images: ImageValidator,
}

impl MergeEngine {
    pub fn new() -> Self {
        Self {
            images: ImageValidator::new(),
        }
    }

    /// Uses `validator` for every images list the merge writes.
    pub fn with_image_validator(mut self, validator: ImageValidator) -> Self {
        self.images = validator;
        self
    }

    /// Merges `update` onto `base`, stamped with the current time.
    pub fn merge(
        &self,
        base: &Flow,
        update: JsonValue,
        updated_by: &str,
    ) -> Result<Flow, FlowError> {
        self.merge_at(base, update, updated_by, Utc::now())
    }

    /// Merges onto a base given as raw JSON, rejecting bases that are not flows.
    pub fn merge_document(
        &self,
        base: JsonValue,
        update: JsonValue,
        updated_by: &str,
    ) -> Result<Flow, FlowError> {
        let base: Flow =
            serde_json::from_value(base).map_err(|e| FlowError::InvalidDocument(e.to_string()))?;
        self.merge(&base, update, updated_by)
    }

    /// Same as [`merge`](Self::merge) with an explicit clock.
    pub fn merge_at(
        &self,
        base: &Flow,
        update: JsonValue,
        updated_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Flow, FlowError> {
        let update = UpdateDocument::parse(update)?;

        if let Some(id) = update.id()
            && id.as_str() != Some(base.id.as_str())
        {
            return Err(FlowError::IdMismatch {
                base: base.id.clone(),
                update: id.as_str().map_or_else(|| id.to_string(), str::to_string),
            });
        }

        let updated_fields = update.field_names();
        let JsonValue::Object(mut target) = serde_json::to_value(base)? else {
            return Err(FlowError::InvalidDocument(
                "flow did not serialize to an object".to_string(),
            ));
        };

        for (key, patch) in update.entries {
            if key == "id" || ENGINE_OWNED_KEYS.contains(&key.as_str()) {
                continue;
            }
            match patch {
                Patch::Steps(entries) => {
                    let steps = self.merge_steps(&base.steps, entries)?;
                    target.insert(key, serde_json::to_value(steps)?);
                }
                other => apply_patch(&mut target, key, other),
            }
        }

        let mut merged: Flow = serde_json::from_value(JsonValue::Object(target)).map_err(|e| {
            FlowError::InvalidUpdate(format!("merged document is not a valid flow: {}", e))
        })?;

        merged.updated_at = Some(now);
        merged.update_history.push(UpdateHistoryEntry {
            timestamp: now,
            updated_fields,
            updated_by: updated_by.to_string(),
        });

        info!(
            flow_id = %merged.id,
            steps = merged.steps.len(),
            history = merged.update_history.len(),
            "flow merged"
        );
        Ok(merged)
    }

    /// Renames one step, leaving everything else on it (images included) as stored.
    pub fn update_step_title(
        &self,
        flow: &Flow,
        step_id: &str,
        title: &str,
        updated_by: &str,
    ) -> Result<Flow, FlowError> {
        if flow.step(step_id).is_none() {
            return Err(FlowError::StepNotFound {
                flow_id: flow.id.clone(),
                step_id: step_id.to_string(),
            });
        }

        let steps: Vec<JsonValue> = flow
            .steps
            .iter()
            .map(|s| {
                if s.id == step_id {
                    serde_json::json!({ "id": s.id, "title": title })
                } else {
                    serde_json::json!({ "id": s.id })
                }
            })
            .collect();

        self.merge(flow, serde_json::json!({ "steps": steps }), updated_by)
    }

    fn merge_steps(
        &self,
        stored: &[Step],
        incoming: Vec<Map<String, JsonValue>>,
    ) -> Result<Vec<Step>, FlowError> {
        let mut steps = Vec::with_capacity(incoming.len());

        for (position, mut entry) in incoming.into_iter().enumerate() {
            if entry.get("message").is_some_and(|m| !m.is_null())
                && !entry.contains_key("description")
            {
                let message = entry["message"].clone();
                entry.insert("description".to_string(), message);
            }

            let incoming_images = match entry.remove("images") {
                Some(JsonValue::Array(items)) => self.images.clean(&items),
                _ => Vec::new(),
            };

            let existing = entry
                .get("id")
                .and_then(JsonValue::as_str)
                .and_then(|id| stored.iter().find(|s| s.id == id));

            let mut step = match existing {
                Some(current) => {
                    let JsonValue::Object(mut fields) = serde_json::to_value(current)? else {
                        return Err(FlowError::invalid_step_entry(position, "stored step is not an object"));
                    };
                    fields.extend(entry);
                    let mut step = deserialize_step(position, fields)?;
                    step.images = if incoming_images.is_empty() {
                        self.images.clean_refs(current.images.clone())
                    } else {
                        incoming_images
                    };
                    step
                }
                None => {
                    debug!(position, "inserting new step from update");
                    let mut step = deserialize_step(position, entry)?;
                    step.images = incoming_images;
                    step
                }
            };

            auto_fix_step_keeping_ids(&mut step, position, &steps, stored);
            steps.push(step);
        }

        Ok(steps)
    }
}

fn deserialize_step(position: usize, fields: Map<String, JsonValue>) -> Result<Step, FlowError> {
    serde_json::from_value(JsonValue::Object(fields))
        .map_err(|e| FlowError::invalid_step_entry(position, e.to_string()))
}

/// Applies the per-step repairs; a step without id gets the first `step_<n>`
/// (counting from its position) not used by any stored or already merged step.
fn auto_fix_step_keeping_ids(step: &mut Step, position: usize, merged: &[Step], stored: &[Step]) {
    if step.id.trim().is_empty() {
        let used: HashSet<&str> = merged
            .iter()
            .chain(stored.iter())
            .map(|s| s.id.as_str())
            .collect();
        step.id = (position..)
            .map(step_id)
            .find(|candidate| !used.contains(candidate.as_str()))
            .unwrap_or_else(|| step_id(position));
    }
    auto_fix_step(step, position);
}

/// Writes `patch` under `key`, merging objects in place so existing keys keep
/// their position. A non-object stored value under an object patch becomes `{}`.
fn apply_patch(map: &mut Map<String, JsonValue>, key: String, patch: Patch) {
    match patch {
        Patch::Object(children) => {
            let slot = map.entry(key).or_insert(JsonValue::Null);
            if !slot.is_object() {
                *slot = JsonValue::Object(Map::new());
            }
            if let JsonValue::Object(inner) = slot {
                for (child, patch) in children {
                    apply_patch(inner, child, patch);
                }
            }
        }
        Patch::Primitive(value) => {
            map.insert(key, value);
        }
        Patch::Steps(items) => {
            map.insert(
                key,
                JsonValue::Array(items.into_iter().map(JsonValue::Object).collect()),
            );
        }
    }
}
