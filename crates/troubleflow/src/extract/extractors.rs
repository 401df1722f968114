use super::core::{ContentExtractor, ExtractionStrategy};

use super::error::ParseError;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static ANY_CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*```[^\n]*\n((?:.*\n)*?)^\s*```\s*$").expect("code block pattern is valid")
});

/// Locates the JSON flow document inside a generated response.
pub struct ResponseExtractor {
    strategies: Vec<ExtractionStrategy>,
}

impl ResponseExtractor {
    pub fn new() -> Self {
        Self {
            strategies: ExtractionStrategy::standard(),
        }
    }

    pub fn with_strategies(strategies: Vec<ExtractionStrategy>) -> Self {
        Self { strategies }
    }

    /// Try the configured strategies in order and return the first hit.
    pub fn extract(&self, text: &str) -> Result<String, ParseError> {
        let mut errors = Vec::new();

        for strategy in &self.strategies {
            if let Some(result) = self.extract_with_strategy(text, strategy) {
                debug!(?strategy, "flow payload located");
                return Ok(result);
            }
            errors.push(format!("Strategy {:?} failed", strategy));
        }

        Err(ParseError::AllStrategiesFailed(errors))
    }

    /// Extract content using a single strategy
    pub fn extract_with_strategy(
        &self,
        text: &str,
        strategy: &ExtractionStrategy,
    ) -> Option<String> {
        match strategy {
            ExtractionStrategy::JsonCodeBlock => self.extract_code_block(text, Some("json")),
            ExtractionStrategy::AnyCodeBlock => self
                .extract_code_block(text, None)
                .and_then(|body| self.extract_json_object(&body)),
            ExtractionStrategy::TaggedContent(tag) => self
                .extract_tagged(text, tag)
                .and_then(|body| self.extract_json_object(&body)),
            ExtractionStrategy::FirstJsonObject => self.extract_json_object(text),
        }
    }
}

impl Default for ResponseExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentExtractor for ResponseExtractor {
    fn extract_tagged(&self, text: &str, tag: &str) -> Option<String> {
        let pattern = format!(r"(?s)<{tag}>(.*?)</{tag}>", tag = regex::escape(tag));

        if let Ok(regex) = Regex::new(&pattern)
            && let Some(captures) = regex.captures(text)
            && let Some(content) = captures.get(1)
        {
            return Some(content.as_str().trim().to_string());
        }

        None
    }

    fn extract_json_object(&self, text: &str) -> Option<String> {
        let mut depth = 0usize;
        let mut start_pos = None;
        let mut in_string = false;
        let mut escape_next = false;

        for (i, ch) in text.char_indices() {
            if escape_next {
                escape_next = false;
                continue;
            }

            match ch {
                '\\' if in_string => escape_next = true,
                '"' => in_string = !in_string,
                '{' if !in_string => {
                    if depth == 0 {
                        start_pos = Some(i);
                    }
                    depth += 1;
                }
                '}' if !in_string && depth > 0 => {
                    depth -= 1;
                    if depth == 0
                        && let Some(p) = start_pos
                    {
                        return Some(text[p..=i].to_string());
                    }
                }
                _ => {}
            }
        }

        // Unbalanced: hand back everything from the first brace so the
        // repair pass can try to close it.
        start_pos.map(|p| text[p..].to_string())
    }

    fn extract_code_block(&self, text: &str, language: Option<&str>) -> Option<String> {
        let body = match language {
            Some(lang) => {
                let pattern = format!(
                    r"(?m)^\s*```\s*{}\s*\n((?:.*\n)*?)^\s*```\s*$",
                    regex::escape(lang)
                );
                Regex::new(&pattern).ok()?.captures(text)?.get(1)?.as_str().to_string()
            }
            None => ANY_CODE_BLOCK.captures(text)?.get(1)?.as_str().to_string(),
        };

        let body = body.trim_end();
        if body.is_empty() {
            None
        } else {
            Some(body.to_string())
        }
    }
}
