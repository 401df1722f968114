//! 'troubleflow' - Troubleshooting flow synthesis and merge engine.
//!
//! Turns the free-form text a generation service returns for a failure
//! keyword into a flow of atomic steps and four-way decisions, and applies
//! later partial edits to a stored flow without losing attached images or
//! edit history.
//!
//! ```
//! use troubleflow::{FlowSynthesizer, MergeEngine};
//! use serde_json::json;
//!
//! let text = "タイトル：ブレーキ故障\n\
//!             手順1（step）：車両を停止させ安全を確保する\n\
//!             条件分岐：ブレーキ圧は正常か\n\
//!             選択肢1：正常\n\
//!             選択肢2：低い";
//! let flow = FlowSynthesizer::default().synthesize(text, "ブレーキ故障");
//! assert_eq!(flow.steps[1].options.len(), 4);
//!
//! let edited = MergeEngine::new()
//!     .merge(&flow, json!({"title": "ブレーキ圧低下"}), "operator")
//!     .unwrap();
//! assert_eq!(edited.steps, flow.steps);
//! assert_eq!(edited.update_history.len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod flow;
pub mod images;
pub mod link;
pub mod merge;
pub mod observability;
pub mod parse;
pub mod prompt;
pub mod refine;
pub mod store;
pub mod synth;
mod text;
pub mod validate;

pub use config::SynthesisConfig;
pub use error::FlowError;
pub use flow::{
    ConditionType, DecisionOption, Flow, FlowSummary, ImageRef, Step, StepKind, UpdateHistoryEntry,
};
pub use images::ImageValidator;
pub use merge::{MergeEngine, Patch, UpdateDocument};
pub use prompt::{GenerationPrompt, ToPrompt};
pub use store::{FlowEditor, FlowLocks, FlowStore, InMemoryFlowStore};
pub use synth::{FlowSynthesizer, synthesize_flow};
pub use validate::{ValidationIssue, auto_fix_flow, validate_flow};
