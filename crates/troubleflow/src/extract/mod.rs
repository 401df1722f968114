//! Extraction and repair of JSON flow documents from generated responses.
//!
//! The generation service is asked for marker text, but some prompts (and some
//! models) answer with a JSON flow instead, usually wrapped in prose or a
//! Markdown code block and occasionally cut off mid-object. This module finds
//! the payload and repairs it just enough to parse.
//!
//! ```rust
//! use troubleflow::extract::extract_flow_document;
//!
//! let response = "Here you go:\n```json\n{\"title\": \"ブレーキ故障\", \"steps\": [],}\n```";
//! let doc = extract_flow_document(response).unwrap();
//! assert_eq!(doc["title"], "ブレーキ故障");
//! ```

pub mod core;
pub mod error;
pub mod extractors;

pub use self::core::{ContentExtractor, ExtractionStrategy};
pub use self::error::ParseError;
pub use self::extractors::ResponseExtractor;

use serde_json::Value as JsonValue;
use tracing::debug;

/// Locates the JSON object in `text` and parses it, repairing it on the way if needed.
///
/// Repair runs in two stages: `fuzzy_parser::sanitize_json` (trailing commas,
/// unclosed brackets and strings), then truncation to the last closing brace.
pub fn extract_flow_document(text: &str) -> Result<JsonValue, ParseError> {
    let candidate = ResponseExtractor::new().extract(text)?;
    let value = parse_with_repair(&candidate)?;

    if value.is_object() {
        Ok(value)
    } else {
        Err(ParseError::InvalidFormat(
            "flow payload is not a JSON object".to_string(),
        ))
    }
}

fn parse_with_repair(candidate: &str) -> Result<JsonValue, ParseError> {
    let first_error = match serde_json::from_str::<JsonValue>(candidate) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let sanitized = fuzzy_parser::sanitize_json(candidate);
    if let Ok(value) = serde_json::from_str::<JsonValue>(&sanitized) {
        debug!("flow payload parsed after sanitizing");
        return Ok(value);
    }

    if let Some(last_brace) = candidate.rfind('}') {
        let truncated = &candidate[..=last_brace];
        if let Ok(value) = serde_json::from_str::<JsonValue>(truncated) {
            debug!("flow payload parsed after truncation");
            return Ok(value);
        }
    }

    Err(ParseError::JsonParsingFailed(first_error.to_string()))
}
