//! The synthesis pipeline: generated text in, linked flow out.
//!
//! ```text
//! text ─▶ StepParser ─(empty)─▶ paragraphs* ─(empty)─▶ fallback
//!              │                     │                    │
//!              └─────────────────────┴────────────────────┴─▶ StepRefiner ─▶ link ─▶ Flow
//! ```
//!
//! `*` only when [`SynthesisConfig::paragraph_fallback`] is set.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::config::SynthesisConfig;
use crate::extract::extract_flow_document;
use crate::fallback::fallback_nodes;
use crate::flow::Flow;
use crate::link::link;
use crate::parse::{RawNode, StepParser, close_decision, extract_title, parse_paragraphs};
use crate::refine::StepRefiner;
use crate::text::derive_title;

const SLUG_MAX_CHARS: usize = 50;

/// Builds new flows from generated text.
///
/// Synthesis never fails: text without recognizable structure yields the
/// fixed three-step fallback procedure.
///
/// # Examples
///
/// ```
/// use troubleflow::FlowSynthesizer;
///
/// let flow = FlowSynthesizer::default().synthesize("", "ブレーキ故障");
/// assert_eq!(flow.steps.len(), 3);
/// assert_eq!(flow.steps[0].id, "step_1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FlowSynthesizer {
    config: SynthesisConfig,
}

impl FlowSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Synthesizes a flow from marker text, stamped with the current time.
    pub fn synthesize(&self, text: &str, keyword: &str) -> Flow {
        self.synthesize_at(text, keyword, Utc::now())
    }

    /// Same as [`synthesize`](Self::synthesize) with an explicit clock.
    pub fn synthesize_at(&self, text: &str, keyword: &str, now: DateTime<Utc>) -> Flow {
        let nodes = self.parse_nodes(text, keyword);
        let title = extract_title(text).unwrap_or_else(|| keyword.trim().to_string());
        self.assemble(nodes, title, flow_description(keyword), keyword, now)
    }

    /// Synthesizes a flow from a response that carries a JSON flow document.
    ///
    /// Falls back to [`synthesize`](Self::synthesize) on the raw text when no
    /// document with usable steps can be extracted.
    pub fn synthesize_from_json_response(&self, raw: &str, keyword: &str) -> Flow {
        self.synthesize_from_json_response_at(raw, keyword, Utc::now())
    }

    pub fn synthesize_from_json_response_at(
        &self,
        raw: &str,
        keyword: &str,
        now: DateTime<Utc>,
    ) -> Flow {
        match extract_flow_document(raw) {
            Ok(doc) => {
                let nodes = self.nodes_from_document(&doc);
                if !nodes.is_empty() {
                    let title = non_empty(str_field(&doc, "title"))
                        .unwrap_or_else(|| keyword.trim().to_string());
                    let description = non_empty(str_field(&doc, "description"))
                        .unwrap_or_else(|| flow_description(keyword));
                    return self.assemble(nodes, title, description, keyword, now);
                }
                debug!("flow document has no usable steps, parsing raw text");
            }
            Err(e) => debug!(error = %e, "no flow document in response, parsing raw text"),
        }
        self.synthesize_at(raw, keyword, now)
    }

    fn parse_nodes(&self, text: &str, keyword: &str) -> Vec<RawNode> {
        let nodes = StepParser::new(&self.config).parse(text);
        if !nodes.is_empty() {
            return nodes;
        }

        if self.config.paragraph_fallback {
            let nodes = parse_paragraphs(text, self.config.title_max_chars);
            if !nodes.is_empty() {
                debug!(nodes = nodes.len(), "no markers found, using paragraphs");
                return nodes;
            }
        }

        warn!(keyword = %keyword, "no steps recognized, using fallback procedure");
        fallback_nodes(keyword)
    }

    fn assemble(
        &self,
        nodes: Vec<RawNode>,
        title: String,
        description: String,
        keyword: &str,
        now: DateTime<Utc>,
    ) -> Flow {
        let parsed = nodes.len();
        let steps = link(StepRefiner::new(&self.config).refine(nodes));
        let flow = Flow {
            id: flow_id(keyword, now),
            title,
            description,
            trigger_keywords: trigger_keywords(keyword),
            steps,
            created_at: Some(now),
            updated_at: Some(now),
            update_history: Vec::new(),
            extra: Map::new(),
        };

        info!(
            flow_id = %flow.id,
            parsed,
            steps = flow.steps.len(),
            decisions = flow.steps.iter().filter(|s| s.is_decision()).count(),
            "flow synthesized"
        );
        flow
    }

    fn nodes_from_document(&self, doc: &JsonValue) -> Vec<RawNode> {
        let Some(entries) = doc.get("steps").and_then(JsonValue::as_array) else {
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|entry| self.node_from_entry(entry))
            .collect()
    }

    fn node_from_entry(&self, entry: &JsonValue) -> Option<RawNode> {
        let title = str_field(entry, "title");
        let description = [str_field(entry, "description"), str_field(entry, "message")]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or_default();

        match str_field(entry, "type") {
            "decision" | "condition" => Some(close_decision(
                &self.config,
                title,
                description,
                option_texts(entry),
            )),
            _ if title.is_empty() && description.is_empty() => None,
            _ => {
                let description = if description.is_empty() { title } else { description };
                let title = if title.is_empty() {
                    derive_title(description, self.config.title_max_chars)
                } else {
                    title.to_string()
                };
                Some(RawNode::Step {
                    title,
                    description: description.to_string(),
                })
            }
        }
    }
}

/// Synthesizes a flow with the default configuration.
pub fn synthesize_flow(text: &str, keyword: &str) -> Flow {
    FlowSynthesizer::default().synthesize(text, keyword)
}

/// `flow_<millis>`, or `flow_<slug>_<millis>` when the keyword has ASCII
/// letters or digits to build a slug from.
pub fn flow_id(keyword: &str, now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis();
    match keyword_slug(keyword) {
        Some(slug) => format!("flow_{}_{}", slug, millis),
        None => format!("flow_{}", millis),
    }
}

fn keyword_slug(keyword: &str) -> Option<String> {
    if !keyword.chars().any(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    let mut slug = String::new();
    for ch in keyword.to_lowercase().chars() {
        let ch = if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
            ch
        } else {
            '_'
        };
        if ch == '_' && slug.ends_with('_') {
            continue;
        }
        slug.push(ch);
    }
    Some(slug.chars().take(SLUG_MAX_CHARS).collect())
}

fn flow_description(keyword: &str) -> String {
    format!("自動生成された{}の応急処置フロー", keyword.trim())
}

/// The keyword split on `,` and `、`; the whole keyword when that leaves nothing.
fn trigger_keywords(keyword: &str) -> Vec<String> {
    let parts: Vec<String> = keyword
        .split([',', '、'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if parts.is_empty() && !keyword.trim().is_empty() {
        vec![keyword.trim().to_string()]
    } else {
        parts
    }
}

fn option_texts(entry: &JsonValue) -> Vec<String> {
    [("options", "text"), ("conditions", "label"), ("options", "label")]
        .into_iter()
        .map(|(list, key)| labels(entry, list, key))
        .find(|texts| !texts.is_empty())
        .unwrap_or_default()
}

fn labels(entry: &JsonValue, list: &str, key: &str) -> Vec<String> {
    entry
        .get(list)
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| item.as_str().map(str::trim).unwrap_or_else(|| str_field(item, key)))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn str_field<'a>(value: &'a JsonValue, key: &str) -> &'a str {
    value
        .get(key)
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .unwrap_or_default()
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
