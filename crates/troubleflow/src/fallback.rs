//! Fixed three-step procedure used when the generated text yields no nodes.

use crate::parse::RawNode;

/// Safety check, detailed inspection, escalation to a technician.
pub fn fallback_nodes(keyword: &str) -> Vec<RawNode> {
    vec![
        RawNode::Step {
            title: format!("{}の安全確認", keyword),
            description: format!(
                "{}の状況を安全に確認してください。作業現場の安全を確保し、必要に応じて緊急停止を行ってください。",
                keyword
            ),
        },
        RawNode::Step {
            title: format!("{}の詳細点検", keyword),
            description: format!(
                "{}の故障状況を詳細に点検し、問題の程度と範囲を確認してください。",
                keyword
            ),
        },
        RawNode::Step {
            title: "専門技術者への連絡".to_string(),
            description: "安全で確実な対応のため、専門技術者に連絡して指示を仰いでください。"
                .to_string(),
        },
    ]
}
