use serde::{Deserialize, Serialize};

/// Trait for pulling structured content out of a raw response.
pub trait ContentExtractor {
    /// Extract content within `<tag>...</tag>`.
    fn extract_tagged(&self, text: &str, tag: &str) -> Option<String>;

    /// Extract the first balanced `{...}` object.
    fn extract_json_object(&self, text: &str) -> Option<String>;

    /// Extract the body of a fenced code block, optionally filtered by language.
    fn extract_code_block(&self, text: &str, language: Option<&str>) -> Option<String>;
}

/// One way of locating a JSON flow document inside a generated response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionStrategy {
    /// ```json fenced block
    JsonCodeBlock,

    /// Any fenced block whose body contains an object
    AnyCodeBlock,

    /// Content within XML-like tags: <tag>content</tag>
    TaggedContent(String),

    /// First balanced JSON object in the raw text
    FirstJsonObject,
}

impl ExtractionStrategy {
    /// Strategies tried, in order, when none are given explicitly.
    pub fn standard() -> Vec<ExtractionStrategy> {
        vec![
            ExtractionStrategy::JsonCodeBlock,
            ExtractionStrategy::AnyCodeBlock,
            ExtractionStrategy::TaggedContent("answer".to_string()),
            ExtractionStrategy::FirstJsonObject,
        ]
    }
}
