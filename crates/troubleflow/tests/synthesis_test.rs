use chrono::{TimeZone, Utc};
use troubleflow::link::branch_target;
use troubleflow::{ConditionType, Flow, FlowSynthesizer, StepKind, SynthesisConfig, validate_flow};

fn synthesize(text: &str, keyword: &str) -> Flow {
    let now = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap();
    FlowSynthesizer::default().synthesize_at(text, keyword, now)
}

fn assert_structure(flow: &Flow) {
    let n = flow.steps.len();
    assert!(n >= 1, "flow must not be empty");

    for (i, step) in flow.steps.iter().enumerate() {
        assert_eq!(step.id, format!("step_{}", i + 1));
        assert_eq!(step.description, step.message);
        if step.kind == StepKind::Decision {
            assert_eq!(step.options.len(), 4, "decision {} must carry four options", step.id);
            for (k, option) in step.options.iter().enumerate() {
                assert_eq!(option.next_step_id, format!("step_{}", branch_target(i, k, n) + 1));
                assert_eq!(option.condition_type, ConditionType::from_index(k));
                assert_eq!(option.condition, option.text);
                assert!(!option.is_terminal);
            }
        } else {
            assert!(step.options.is_empty());
        }
    }

    assert!(validate_flow(flow).is_empty(), "{:?}", validate_flow(flow));
}

const SAMPLE: &str = "\
タイトル：エンジン停止時の応急処置
手順1（step）：車両を安全な場所に停止させる
説明：ハザードランプを点灯し、後続車両に注意を促す
条件分岐：エンジンは再始動できるか
説明：セルモーターを3秒以上回さないこと
選択肢1：再始動できる
選択肢2：再始動できない
選択肢3：異音がする
手順2（step）：燃料残量を確認する
**手順3（Step）：** バッテリー電圧を測定する
条件分岐2：電圧は12V以上か
1．：はい
2．：いいえ
";

#[test]
fn test_sample_text_produces_linked_flow() {
    let flow = synthesize(SAMPLE, "エンジン停止");
    assert_structure(&flow);

    assert_eq!(flow.title, "エンジン停止時の応急処置");
    assert_eq!(flow.trigger_keywords, vec!["エンジン停止"]);
    assert_eq!(flow.steps.len(), 5);

    let kinds: Vec<_> = flow.steps.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            StepKind::Step,
            StepKind::Decision,
            StepKind::Step,
            StepKind::Step,
            StepKind::Decision
        ]
    );

    let first_decision: Vec<_> = flow.steps[1].options.iter().map(|o| o.text.as_str()).collect();
    assert_eq!(first_decision, vec!["再始動できる", "再始動できない", "異音がする", "緊急"]);
    assert_eq!(flow.steps[1].description, "セルモーターを3秒以上回さないこと");

    let last = &flow.steps[4];
    assert!(last.options.iter().all(|o| o.next_step_id == "step_5"));
}

#[test]
fn test_always_non_empty() {
    for text in ["", "   \n\n", "マーカーのない文章", "選択肢1：はい", "説明：なし"] {
        let flow = synthesize(text, "油圧低下");
        assert!(flow.steps.len() >= 3);
        assert_structure(&flow);
    }
}

#[test]
fn test_scenario_a_decision_is_padded() {
    let flow = synthesize(
        "手順1（step）：ブレーキレバーの位置を確認する\n\
         条件分岐：ブレーキは効くか\n\
         選択肢1：効く\n\
         選択肢2：効かない",
        "ブレーキ",
    );
    assert_structure(&flow);

    let decision = &flow.steps[1];
    assert!(decision.is_decision());
    assert_eq!(decision.options.len(), 4);
    assert_eq!(decision.options[2].text, "確認が必要");
    assert_eq!(decision.options[3].text, "緊急");
    assert_eq!(decision.options[2].condition_type, ConditionType::Maybe);
    assert_eq!(decision.options[3].condition_type, ConditionType::Other);
}

#[test]
fn test_scenario_b_empty_text_uses_fallback() {
    let flow = synthesize("", "ブレーキ故障");
    assert_structure(&flow);

    let titles: Vec<_> = flow.steps.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["ブレーキ故障の安全確認", "ブレーキ故障の詳細点検", "専門技術者への連絡"]
    );
    assert!(flow.steps.iter().all(|s| s.kind == StepKind::Step));
}

#[test]
fn test_scenario_c_long_step_is_split() {
    let sentences: Vec<String> = ["安", "点", "測", "報"]
        .iter()
        .map(|c| format!("{}。", c.repeat(74)))
        .collect();
    let body = sentences.concat();
    assert_eq!(body.chars().count(), 300);

    let text = format!(
        "手順1（step）：{}\n条件分岐：{}\n選択肢1：a\n選択肢2：b\n選択肢3：c\n選択肢4：d",
        body,
        "判".repeat(200)
    );
    let flow = synthesize(&text, "x");
    assert_structure(&flow);

    assert_eq!(flow.steps.len(), 5);
    for (step, sentence) in flow.steps.iter().zip(&sentences) {
        assert_eq!(&step.description, sentence);
        assert_eq!(step.title, format!("{}...", &sentence.chars().take(50).collect::<String>()));
    }

    let decision = &flow.steps[4];
    assert!(decision.is_decision());
    assert_eq!(decision.description, "判".repeat(200));
}

#[test]
fn test_legacy_step_marker() {
    let flow = synthesize("手順1：電源を確認する\n手順2：ヒューズを確認する", "電源");
    assert_structure(&flow);
    assert_eq!(flow.steps.len(), 2);
    assert_eq!(flow.steps[0].title, "電源を確認する");
}

#[test]
fn test_custom_thresholds() {
    let config = SynthesisConfig::new().with_split_threshold(20).with_min_fragment(3);
    let flow = FlowSynthesizer::new(config).synthesize(
        "手順1（step）：電源を切る。ヒューズを外す。端子を清掃する。",
        "電源",
    );
    assert_structure(&flow);
    assert_eq!(flow.steps.len(), 3);
    assert_eq!(flow.steps[2].description, "端子を清掃する。");
}

#[test]
fn test_flow_serializes_for_storage() {
    let flow = synthesize(SAMPLE, "エンジン停止");
    let value = serde_json::to_value(&flow).unwrap();

    assert_eq!(value["triggerKeywords"][0], "エンジン停止");
    assert_eq!(value["steps"][1]["type"], "decision");
    assert_eq!(value["steps"][1]["options"][0]["nextStepId"], "step_3");
    assert_eq!(value["createdAt"], "2026-04-01T09:00:00Z");
    assert_eq!(value["updateHistory"], serde_json::json!([]));

    let back: Flow = serde_json::from_value(value).unwrap();
    assert_eq!(back, flow);
}
