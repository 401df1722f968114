//! Splits coarse steps into atomic, one-sentence steps.
//!
//! Runs once over the fully assembled node list so every split sees the final
//! body of its step. Decisions are never split.

use tracing::debug;

use crate::config::SynthesisConfig;
use crate::parse::RawNode;
use crate::text::{char_len, derive_title};

const SENTENCE_TERMINATORS: [char; 6] = ['。', '．', '！', '？', '!', '?'];

pub struct StepRefiner<'a> {
    config: &'a SynthesisConfig,
}

impl<'a> StepRefiner<'a> {
    pub fn new(config: &'a SynthesisConfig) -> Self {
        Self { config }
    }

    /// Replaces every plain step whose body exceeds the split threshold with
    /// one step per surviving sentence.
    pub fn refine(&self, nodes: Vec<RawNode>) -> Vec<RawNode> {
        let mut refined = Vec::with_capacity(nodes.len());

        for node in nodes {
            match node {
                RawNode::Step { title, description }
                    if char_len(&description) > self.config.split_threshold_chars =>
                {
                    let sentences = self.sentences(&description);
                    if sentences.is_empty() {
                        refined.push(RawNode::Step { title, description });
                        continue;
                    }
                    debug!(
                        chars = char_len(&description),
                        parts = sentences.len(),
                        "splitting coarse step"
                    );
                    refined.extend(sentences.into_iter().map(|sentence| RawNode::Step {
                        title: derive_title(&sentence, self.config.title_max_chars),
                        description: sentence,
                    }));
                }
                other => refined.push(other),
            }
        }

        refined
    }

    /// Sentences of `body` (terminator kept), fragments below the minimum dropped.
    fn sentences(&self, body: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut buf = String::new();

        let mut flush = |buf: &mut String| {
            let sentence = buf.trim();
            if char_len(sentence) >= self.config.min_fragment_chars {
                sentences.push(sentence.to_string());
            }
            buf.clear();
        };

        for ch in body.chars() {
            if ch == '\n' {
                flush(&mut buf);
                continue;
            }
            buf.push(ch);
            if SENTENCE_TERMINATORS.contains(&ch) {
                flush(&mut buf);
            }
        }
        flush(&mut buf);

        sentences
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(description: &str) -> RawNode {
        RawNode::Step {
            title: "t".to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_short_steps_are_untouched() {
        let config = SynthesisConfig::default();
        let nodes = vec![step("電源を切る。ヒューズを確認する。")];
        assert_eq!(StepRefiner::new(&config).refine(nodes.clone()), nodes);
    }

    #[test]
    fn test_long_step_is_split_per_sentence() {
        let config = SynthesisConfig::default();
        let sentence = format!("{}。", "あ".repeat(59));
        let body = sentence.repeat(3);
        let refined = StepRefiner::new(&config).refine(vec![step(&body)]);

        assert_eq!(refined.len(), 3);
        assert_eq!(refined[0].description(), sentence);
        assert_eq!(refined[0].title(), format!("{}...", "あ".repeat(50)));
    }

    #[test]
    fn test_short_fragments_are_dropped() {
        let config = SynthesisConfig::default();
        let body = format!("短い。\n{}。はい。", "い".repeat(160));
        let refined = StepRefiner::new(&config).refine(vec![step(&body)]);
        assert_eq!(refined.len(), 1);
        assert_eq!(char_len(refined[0].description()), 161);
    }

    #[test]
    fn test_decisions_are_never_split() {
        let config = SynthesisConfig::default();
        let decision = RawNode::Decision {
            title: "d".to_string(),
            description: format!("{}。", "う".repeat(200)).repeat(2),
            options: Vec::new(),
        };
        let refined = StepRefiner::new(&config).refine(vec![decision.clone()]);
        assert_eq!(refined, vec![decision]);
    }

    #[test]
    fn test_unsplittable_step_is_kept() {
        let config = SynthesisConfig::default().with_min_fragment(500);
        let body = "え".repeat(200);
        let refined = StepRefiner::new(&config).refine(vec![step(&body)]);
        assert_eq!(refined.len(), 1);
        assert_eq!(refined[0].description(), body);
    }
}
