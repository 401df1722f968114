//! Tunables for the synthesis pipeline.

use serde::{Deserialize, Serialize};

/// Labels used, by position, to pad decisions that list fewer than four options.
pub const DEFAULT_OPTION_POOL: [&str; 4] = ["その他", "不明", "確認が必要", "緊急"];

/// Number of options every decision step carries.
pub const DECISION_OPTION_COUNT: usize = 4;

/// Configuration for [`FlowSynthesizer`](crate::FlowSynthesizer).
///
/// # Examples
///
/// ```
/// use troubleflow::SynthesisConfig;
///
/// let config = SynthesisConfig::new()
///     .with_split_threshold(200)
///     .with_paragraph_fallback(true);
/// assert_eq!(config.split_threshold_chars, 200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Step bodies longer than this many characters are split into sentences.
    pub split_threshold_chars: usize,

    /// Sentence fragments shorter than this are discarded when splitting.
    pub min_fragment_chars: usize,

    /// Titles derived from a body are cut to this many characters (plus `...`).
    pub title_max_chars: usize,

    /// Labels used to pad decisions; entry `i` fills option slot `i`.
    pub option_fallback_pool: Vec<String>,

    /// Treat plain paragraphs as steps when the text carries no markers.
    ///
    /// **Default:** `false` (marker-less text goes straight to the fixed
    /// three-step fallback)
    #[serde(default)]
    pub paragraph_fallback: bool,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SynthesisConfig {
    /// Creates a configuration with the default values.
    ///
    /// - `split_threshold_chars`: `150`
    /// - `min_fragment_chars`: `10`
    /// - `title_max_chars`: `50`
    /// - `option_fallback_pool`: `その他`, `不明`, `確認が必要`, `緊急`
    /// - `paragraph_fallback`: `false`
    pub fn new() -> Self {
        Self {
            split_threshold_chars: 150,
            min_fragment_chars: 10,
            title_max_chars: 50,
            option_fallback_pool: DEFAULT_OPTION_POOL.iter().map(|s| s.to_string()).collect(),
            paragraph_fallback: false,
        }
    }

    pub fn with_split_threshold(mut self, chars: usize) -> Self {
        self.split_threshold_chars = chars;
        self
    }

    pub fn with_min_fragment(mut self, chars: usize) -> Self {
        self.min_fragment_chars = chars;
        self
    }

    pub fn with_title_max(mut self, chars: usize) -> Self {
        self.title_max_chars = chars;
        self
    }

    /// Replaces the padding pool. Slots the pool does not cover fall back to
    /// [`DEFAULT_OPTION_POOL`].
    pub fn with_option_pool<I, S>(mut self, pool: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.option_fallback_pool = pool.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_paragraph_fallback(mut self, enabled: bool) -> Self {
        self.paragraph_fallback = enabled;
        self
    }

    /// Padding label for option slot `index`.
    pub fn fallback_option(&self, index: usize) -> String {
        self.option_fallback_pool
            .get(index)
            .cloned()
            .unwrap_or_else(|| DEFAULT_OPTION_POOL[index % DECISION_OPTION_COUNT].to_string())
    }
}
