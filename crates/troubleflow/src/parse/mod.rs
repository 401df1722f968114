//! Turns line-oriented generated text into an ordered list of raw nodes.
//!
//! The parser only recognizes structure; ids and branch targets are assigned
//! later by [`crate::link`], and over-long steps are split by
//! [`crate::refine`].

pub mod markers;
pub mod paragraph;
pub mod parser;

pub use markers::{LineMarker, classify};
pub use paragraph::parse_paragraphs;
pub use parser::{StepParser, close_decision, extract_title};

use crate::flow::{DecisionOption, Step};

/// A parsed node before identifiers and links are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawNode {
    Step {
        title: String,
        description: String,
    },
    Decision {
        title: String,
        description: String,
        /// Always four entries once closed, targets unresolved.
        options: Vec<DecisionOption>,
    },
}

impl RawNode {
    pub fn is_decision(&self) -> bool {
        matches!(self, RawNode::Decision { .. })
    }

    pub fn title(&self) -> &str {
        match self {
            RawNode::Step { title, .. } | RawNode::Decision { title, .. } => title,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            RawNode::Step { description, .. } | RawNode::Decision { description, .. } => {
                description
            }
        }
    }

    /// Converts into an unlinked [`Step`].
    pub fn into_step(self) -> Step {
        match self {
            RawNode::Step { title, description } => Step::plain(title, description),
            RawNode::Decision {
                title,
                description,
                options,
            } => Step::decision(title, description, options),
        }
    }
}
