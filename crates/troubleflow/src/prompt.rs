//! Instruction text for the generation service.
//!
//! The engine never calls the service; callers send the rendered prompt and
//! feed the answer to [`FlowSynthesizer`](crate::FlowSynthesizer).

use minijinja::Environment;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Failed to render prompt: {0}")]
    Render(#[from] minijinja::Error),
}

/// Types that render into a prompt string.
pub trait ToPrompt {
    fn to_prompt(&self) -> Result<String, PromptError>;
}

/// Renders `template` with a serializable context.
pub fn render_prompt<T: Serialize>(template: &str, context: T) -> Result<String, PromptError> {
    let mut env = Environment::new();
    env.add_template("prompt", template)?;
    let tmpl = env.get_template("prompt")?;
    Ok(tmpl.render(context)?)
}

const GENERATION_TEMPLATE: &str = "\
あなたは保守用車の故障対応を支援する専門家です。
「{{ keyword }}」が発生したときの応急処置フローを、以下の形式で作成してください。

タイトル：<フローの見出し>
手順1（step）：<実施する作業>
説明：<作業の詳細>
条件分岐：<確認する状態>
選択肢1：<状態A>
選択肢2：<状態B>
{% if max_options > 2 %}選択肢3：<状態C>
{% endif %}{% if max_options > 3 %}選択肢4：<状態D>
{% endif %}
注意事項：
- 手順は1つの作業につき1つにまとめ、{{ max_step_chars }}文字以内で書いてください。
- 条件分岐の選択肢は最大{{ max_options }}つまでにしてください。
- 最初の手順では必ず安全確保を指示してください。
{% if extra_notes %}{% for note in extra_notes %}- {{ note }}
{% endfor %}{% endif %}";

/// Prompt asking for a procedure in the marker format the parser reads.
///
/// ```
/// use troubleflow::{GenerationPrompt, ToPrompt};
///
/// let prompt = GenerationPrompt::new("ブレーキ故障").to_prompt().unwrap();
/// assert!(prompt.contains("「ブレーキ故障」"));
/// assert!(prompt.contains("手順1（step）："));
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct GenerationPrompt {
    keyword: String,
    max_step_chars: usize,
    max_options: usize,
    extra_notes: Vec<String>,
}

impl GenerationPrompt {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            max_step_chars: 150,
            max_options: crate::config::DECISION_OPTION_COUNT,
            extra_notes: Vec::new(),
        }
    }

    pub fn with_max_step_chars(mut self, chars: usize) -> Self {
        self.max_step_chars = chars;
        self
    }

    /// Adds a line to the notes section.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.extra_notes.push(note.into());
        self
    }
}

impl ToPrompt for GenerationPrompt {
    fn to_prompt(&self) -> Result<String, PromptError> {
        render_prompt(GENERATION_TEMPLATE, self)
    }
}
