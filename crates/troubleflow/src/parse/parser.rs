use tracing::debug;

use super::RawNode;
use super::markers::{LineMarker, classify};
use crate::config::{DECISION_OPTION_COUNT, SynthesisConfig};
use crate::flow::DecisionOption;
use crate::text::{append_line, derive_title};

/// Default decision title when neither a label nor a body is given.
const DECISION_PLACEHOLDER: &str = "条件分岐";

/// Node currently accumulating lines.
enum OpenNode {
    Step {
        number: Option<u32>,
        title: String,
        description: String,
    },
    Decision {
        label: String,
        description: String,
        options: Vec<String>,
    },
}

/// Line scanner that emits steps and four-way decisions in document order.
///
/// # Examples
///
/// ```
/// use troubleflow::SynthesisConfig;
/// use troubleflow::parse::StepParser;
///
/// let config = SynthesisConfig::default();
/// let nodes = StepParser::new(&config).parse("手順1（step）：電源を切る\n説明：主電源スイッチをOFFにする");
/// assert_eq!(nodes.len(), 1);
/// assert_eq!(nodes[0].description(), "電源を切る\n主電源スイッチをOFFにする");
/// ```
pub struct StepParser<'a> {
    config: &'a SynthesisConfig,
}

impl<'a> StepParser<'a> {
    pub fn new(config: &'a SynthesisConfig) -> Self {
        Self { config }
    }

    /// Parses `text` into raw nodes. Returns an empty list when no marker is found.
    pub fn parse(&self, text: &str) -> Vec<RawNode> {
        let mut nodes = Vec::new();
        let mut current: Option<OpenNode> = None;

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match classify(line) {
                LineMarker::Title(_) => continue,
                LineMarker::Decision(label) => {
                    if let Some(open) = current.take() {
                        nodes.push(self.close(open));
                    }
                    debug!(label, "decision opened");
                    current = Some(OpenNode::Decision {
                        label: label.to_string(),
                        description: String::new(),
                        options: Vec::new(),
                    });
                }
                LineMarker::Step { number, rest } => {
                    if let Some(open) = current.take() {
                        nodes.push(self.close(open));
                    }
                    debug!(?number, "step opened");
                    current = Some(OpenNode::Step {
                        number,
                        title: derive_title(rest, self.config.title_max_chars),
                        description: rest.to_string(),
                    });
                }
                LineMarker::Option { slot, text } => match current.as_mut() {
                    Some(OpenNode::Decision { options, .. }) => {
                        if !text.is_empty() {
                            options.push(text.to_string());
                        }
                    }
                    _ => debug!(slot, "option line outside a decision ignored"),
                },
                LineMarker::Explanation(body) | LineMarker::Text(body) => match current.as_mut() {
                    Some(OpenNode::Step { description, .. })
                    | Some(OpenNode::Decision { description, .. }) => {
                        append_line(description, body)
                    }
                    None => debug!("text before the first marker ignored"),
                },
            }
        }

        if let Some(open) = current.take() {
            nodes.push(self.close(open));
        }

        nodes
    }

    fn close(&self, open: OpenNode) -> RawNode {
        match open {
            OpenNode::Step {
                number,
                title,
                description,
            } => {
                let title = if !title.is_empty() {
                    title
                } else if !description.is_empty() {
                    derive_title(&description, self.config.title_max_chars)
                } else {
                    number.map_or_else(|| "手順".to_string(), |n| format!("手順{}", n))
                };
                let description = if description.is_empty() {
                    title.clone()
                } else {
                    description
                };
                RawNode::Step { title, description }
            }
            OpenNode::Decision {
                label,
                description,
                options,
            } => close_decision(self.config, &label, &description, options),
        }
    }
}

/// Builds a closed decision node: the option list is padded from the fallback
/// pool (slot `i` takes pool entry `i`) and cut to exactly four.
pub fn close_decision(
    config: &SynthesisConfig,
    label: &str,
    description: &str,
    option_texts: Vec<String>,
) -> RawNode {
    let title = if !label.is_empty() {
        derive_title(label, config.title_max_chars)
    } else if !description.is_empty() {
        derive_title(description, config.title_max_chars)
    } else {
        DECISION_PLACEHOLDER.to_string()
    };
    let description = if description.is_empty() {
        if label.is_empty() {
            title.clone()
        } else {
            label.to_string()
        }
    } else {
        description.to_string()
    };

    let mut texts: Vec<String> = option_texts
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if texts.len() < DECISION_OPTION_COUNT {
        debug!(listed = texts.len(), "padding decision options");
    }
    while texts.len() < DECISION_OPTION_COUNT {
        texts.push(config.fallback_option(texts.len()));
    }
    texts.truncate(DECISION_OPTION_COUNT);
    debug_assert_eq!(texts.len(), DECISION_OPTION_COUNT);

    let options = texts
        .into_iter()
        .enumerate()
        .map(|(slot, text)| DecisionOption::at(slot, text))
        .collect();

    RawNode::Decision {
        title,
        description,
        options,
    }
}

/// Flow title carried by the first non-empty `タイトル：` line, if any.
pub fn extract_title(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .find_map(|line| match classify(line) {
            LineMarker::Title(title) if !title.is_empty() => Some(title.to_string()),
            _ => None,
        })
}
