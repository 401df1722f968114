//! Error types for flow synthesis, merging and storage.

use crate::extract::ParseError;
use thiserror::Error;

/// Errors surfaced to callers of the engine.
///
/// Messy generated text never produces one of these; the synthesis path
/// recovers locally. Only structurally invalid documents handed to the merge
/// engine, or failures of the storage collaborator, end up here.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The persisted base document does not have the shape of a flow.
    #[error("Invalid flow document: {0}")]
    InvalidDocument(String),

    /// The partial update cannot be applied (not an object, `steps` not an array, ...).
    #[error("Invalid update document: {0}")]
    InvalidUpdate(String),

    /// The update names a different flow than the one it is applied to.
    #[error("Flow id mismatch: base is '{base}', update carries '{update}'")]
    IdMismatch { base: String, update: String },

    /// The store has no flow with the requested id.
    #[error("No flow found with id: {0}")]
    NotFound(String),

    /// A single-step edit named a step that is not part of the flow.
    #[error("Step '{step_id}' not found in flow '{flow_id}'")]
    StepNotFound { flow_id: String, step_id: String },

    /// The storage collaborator failed.
    #[error("Store error: {0}")]
    Store(String),

    /// No JSON payload could be pulled out of a generated response.
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ParseError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlowError {
    /// Creates an error for an update whose `steps` entry is malformed.
    pub fn invalid_step_entry(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidUpdate(format!("steps[{}]: {}", index, reason.into()))
    }
}
