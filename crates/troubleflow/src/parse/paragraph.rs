//! Last-resort reading of marker-less text: one step per paragraph line.

use regex::Regex;
use std::sync::LazyLock;

use super::RawNode;
use super::markers::{LineMarker, classify};
use crate::text::{append_line, derive_title};

static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.").expect("numbered item pattern is valid"));

/// Lines that continue the current paragraph instead of opening a new one.
fn is_continuation(line: &str) -> bool {
    line.starts_with("**")
        || line.starts_with("例:")
        || line.starts_with("例：")
        || line.starts_with("手順：")
        || NUMBERED_ITEM.is_match(line)
        || matches!(
            classify(line),
            LineMarker::Title(_) | LineMarker::Step { .. }
        )
}

/// Every non-continuation line opens a plain step; continuation lines are
/// appended to the step before them (or dropped when none is open).
pub fn parse_paragraphs(text: &str, title_max_chars: usize) -> Vec<RawNode> {
    let mut nodes = Vec::new();
    let mut current: Option<(String, String)> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if is_continuation(line) {
            if let Some((_, description)) = current.as_mut() {
                append_line(description, line);
            }
            continue;
        }

        if let Some((title, description)) = current.take() {
            nodes.push(RawNode::Step { title, description });
        }
        current = Some((derive_title(line, title_max_chars), line.to_string()));
    }

    if let Some((title, description)) = current {
        nodes.push(RawNode::Step { title, description });
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_paragraph_line_is_a_step() {
        let nodes = parse_paragraphs("まず電源を切ってください。\nつぎにヒューズを確認します。", 50);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].title(), "つぎにヒューズを確認します。");
    }

    #[test]
    fn test_continuation_lines_attach_to_previous() {
        let nodes = parse_paragraphs("電源を切る\n**注意** 感電に注意\n1. 主電源\n例: ブレーカー", 50);
        assert_eq!(nodes.len(), 1);
        assert_eq!(
            nodes[0].description(),
            "電源を切る\n**注意** 感電に注意\n1. 主電源\n例: ブレーカー"
        );
    }

    #[test]
    fn test_leading_continuation_is_dropped() {
        let nodes = parse_paragraphs("タイトル：油圧低下\n油量を点検する", 50);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].description(), "油量を点検する");
    }

    #[test]
    fn test_long_line_title_is_cut() {
        let line = "点".repeat(80);
        let nodes = parse_paragraphs(&line, 50);
        assert!(nodes[0].title().ends_with("..."));
    }
}
