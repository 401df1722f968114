//! Line markers recognized in generated procedure text.
//!
//! Every pattern tolerates the decorations models like to add in front of a
//! marker: list bullets, heading hashes, block quotes and `**` emphasis.

use regex::Regex;
use std::sync::LazyLock;

static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\s\-*#・>]*(?:\d+[.．]\s*)?\**タイトル\**\s*[:：]\s*(.*)$")
        .expect("title marker pattern is valid")
});

static DECISION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[\s\-*#・>]*\**(?:手順\s*\d+\s*)?(?:[（(]\s*条件分岐\s*\d*\s*[)）]\s*\**\s*[:：]?|条件分岐\s*\d*\s*\**\s*[:：])\s*(.*)$",
    )
    .expect("decision marker pattern is valid")
});

static STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[\s\-*#・>]*\**手順\s*(\d+)\s*(?:[（(]\s*(?i:step)\s*[)）]\s*\**\s*[:：]?|\**\s*[:：])\s*(.*)$",
    )
    .expect("step marker pattern is valid")
});

static EXPLANATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\s\-*#・>]*\**説明\**\s*[:：]\s*(.*)$")
        .expect("explanation marker pattern is valid")
});

static OPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\s\-*#・>]*\**(?:選択肢\s*([1-4１-４])|([1-4１-４])\s*[.．])\**\s*[:：]\s*(.*)$")
        .expect("option marker pattern is valid")
});

/// What a single (trimmed, non-empty) line of generated text is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMarker<'a> {
    /// `タイトル：...`, consumed by the header pass.
    Title(&'a str),
    /// `条件分岐：<label>`, optionally numbered.
    Decision(&'a str),
    /// `手順N（step）：...` or the older `手順N：...`.
    Step { number: Option<u32>, rest: &'a str },
    /// `説明：...`
    Explanation(&'a str),
    /// `選択肢N：...` or `N．：...`; `slot` is zero-based.
    Option { slot: usize, text: &'a str },
    /// Anything else: continuation text.
    Text(&'a str),
}

/// Classifies one line. Checks run from most to least specific.
pub fn classify(line: &str) -> LineMarker<'_> {
    if let Some(caps) = TITLE.captures(line) {
        return LineMarker::Title(capture(&caps, 1, line));
    }
    if let Some(caps) = DECISION.captures(line) {
        return LineMarker::Decision(capture(&caps, 1, line));
    }
    if let Some(caps) = STEP.captures(line) {
        let number = caps.get(1).and_then(|m| m.as_str().parse().ok());
        return LineMarker::Step {
            number,
            rest: capture(&caps, 2, line),
        };
    }
    if let Some(caps) = EXPLANATION.captures(line) {
        return LineMarker::Explanation(capture(&caps, 1, line));
    }
    if let Some(caps) = OPTION.captures(line)
        && let Some(digit) = caps.get(1).or_else(|| caps.get(2))
    {
        return LineMarker::Option {
            slot: option_slot(digit.as_str()),
            text: capture(&caps, 3, line),
        };
    }
    LineMarker::Text(line)
}

fn capture<'a>(caps: &regex::Captures<'a>, index: usize, line: &'a str) -> &'a str {
    caps.get(index)
        .map(|m| crate::text::clean_fragment(m.as_str()))
        .unwrap_or_else(|| &line[line.len()..])
}

fn option_slot(digit: &str) -> usize {
    match digit {
        "1" | "１" => 0,
        "2" | "２" => 1,
        "3" | "３" => 2,
        _ => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_marker_with_tag() {
        assert_eq!(
            classify("手順1（step）: ブレーキ圧を確認する"),
            LineMarker::Step {
                number: Some(1),
                rest: "ブレーキ圧を確認する"
            }
        );
        assert_eq!(
            classify("**手順12(Step)：** 配管を点検"),
            LineMarker::Step {
                number: Some(12),
                rest: "配管を点検"
            }
        );
    }

    #[test]
    fn test_legacy_step_marker() {
        assert_eq!(
            classify("- 手順2：バッテリー端子の点検"),
            LineMarker::Step {
                number: Some(2),
                rest: "バッテリー端子の点検"
            }
        );
    }

    #[test]
    fn test_decision_marker() {
        assert_eq!(
            classify("条件分岐: エンジンは始動するか"),
            LineMarker::Decision("エンジンは始動するか")
        );
        assert_eq!(
            classify("条件分岐2：圧力は正常か"),
            LineMarker::Decision("圧力は正常か")
        );
        assert_eq!(
            classify("手順3（条件分岐）：異音はあるか"),
            LineMarker::Decision("異音はあるか")
        );
    }

    #[test]
    fn test_option_markers() {
        assert_eq!(
            classify("選択肢1：はい"),
            LineMarker::Option { slot: 0, text: "はい" }
        );
        assert_eq!(
            classify("4．：わからない"),
            LineMarker::Option {
                slot: 3,
                text: "わからない"
            }
        );
    }

    #[test]
    fn test_title_and_explanation() {
        assert_eq!(classify("1. タイトル：ブレーキ故障"), LineMarker::Title("ブレーキ故障"));
        assert_eq!(classify("**タイトル**：油圧低下"), LineMarker::Title("油圧低下"));
        assert_eq!(classify("説明：周囲の安全を確保"), LineMarker::Explanation("周囲の安全を確保"));
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(classify("作業前に手袋を着用する"), LineMarker::Text("作業前に手袋を着用する"));
        assert_eq!(classify("手順の概要"), LineMarker::Text("手順の概要"));
    }

    #[test]
    fn test_empty_remainder() {
        assert_eq!(classify("条件分岐："), LineMarker::Decision(""));
        assert_eq!(classify("（条件分岐）"), LineMarker::Decision(""));
    }

    #[test]
    fn test_decision_word_in_sentence_is_text() {
        assert_eq!(
            classify("条件分岐の前に必ずブレーカーも落とす"),
            LineMarker::Text("条件分岐の前に必ずブレーカーも落とす")
        );
        assert_eq!(classify("条件分岐"), LineMarker::Text("条件分岐"));
        assert_eq!(
            classify("**条件分岐**：警告灯は点灯しているか"),
            LineMarker::Decision("警告灯は点灯しているか")
        );
    }
}
