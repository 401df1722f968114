//! Assigns step identifiers and the initial branch targets.
//!
//! Ids are purely positional (`step_1`, `step_2`, ...). Option `k` of the
//! decision at position `i` initially points at position
//! `min(i + 1 + k, len - 1)`. These targets are computed once, at synthesis;
//! later edits never recompute them from list order.

use crate::flow::Step;
use crate::parse::RawNode;

/// Identifier of the step at zero-based `index`.
pub fn step_id(index: usize) -> String {
    format!("step_{}", index + 1)
}

/// Target position of option `option_index` on the decision at `position`.
pub fn branch_target(position: usize, option_index: usize, len: usize) -> usize {
    (position + 1 + option_index).min(len.saturating_sub(1))
}

/// Converts refined nodes into the final, linked step list.
pub fn link(nodes: Vec<RawNode>) -> Vec<Step> {
    let len = nodes.len();

    nodes
        .into_iter()
        .enumerate()
        .map(|(position, node)| {
            let mut step = node.into_step();
            step.id = step_id(position);
            for (k, option) in step.options.iter_mut().enumerate() {
                option.next_step_id = step_id(branch_target(position, k, len));
            }
            step
        })
        .collect()
}
