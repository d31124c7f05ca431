mod common;

use chrono::NaiveDate;

use transcript_pdf::layout::{COLOR_BORDER, mm};
use transcript_pdf::model::{BranchInfo, ToolCall};
use transcript_pdf::surface::{LinkTarget, Op, Pen, Surface};
use transcript_pdf::{
    Error, ExportConfig, Meta, Sender, Transcript, export_filename, platform_prefix,
    render_transcript,
};

/// Human greeting, an assistant answer whose 40-line code block straddles the
/// first page break, then a second human turn.
fn three_messages() -> Transcript {
    let answer = format!(
        "Here is the plan.\n\nFirst we load.\n\nThen we compute.\n\nThen we store.\n\nFinally we report.\n\n{}\n\nThat is all.",
        common::code_block("rust", 40)
    );
    common::transcript(vec![
        common::human("Hello, can you help?"),
        common::assistant(&answer),
        common::human("Thanks"),
    ])
}

fn toc_targets(rec: &transcript_pdf::surface::Recorder, page: usize) -> Vec<usize> {
    rec.ops_on_page(page)
        .filter_map(|op| match op {
            Op::Link {
                target: LinkTarget::Page(p),
                ..
            } => Some(*p),
            _ => None,
        })
        .collect()
}

#[test]
fn three_message_document_layout() {
    let mut rec = common::a4();
    let report = common::render(&mut rec, &three_messages());

    assert_eq!(report.pages, 4);
    assert_eq!(rec.page_count(), 4);
    let anchor_pages: Vec<_> = report.anchors.iter().map(|a| a.page).collect();
    assert_eq!(anchor_pages, [1, 1, 3]);

    assert_eq!(rec.page_of_text("Pagination test"), Some(1));
    assert_eq!(rec.page_of_text("Platform: claude"), Some(1));
    assert_eq!(rec.page_of_text("Exported: 2026-01-02 03:04:05"), Some(1));

    // The code block starts on page 1 and runs onto page 2.
    assert_eq!(rec.page_of_text("let value_1 "), Some(1));
    assert_eq!(rec.page_of_text("let value_40 "), Some(2));
    assert_eq!(rec.page_of_text("That is all."), Some(2));

    // The second human turn opens a page of its own.
    assert_eq!(rec.page_of_text("3. Human"), Some(3));
    assert_eq!(rec.page_of_text("Thanks"), Some(3));

    assert_eq!(report.toc_page, Some(4));
    assert_eq!(report.toc_entries, 3);
    assert_eq!(rec.page_of_text("Table of Contents"), Some(4));
    assert_eq!(toc_targets(&rec, 4), [1, 1, 1, 1, 3, 3]);

    let counters = common::page_counters(&rec);
    assert_eq!(
        counters,
        [
            (1, "1 / 4".to_string()),
            (2, "2 / 4".to_string()),
            (3, "3 / 4".to_string()),
            (4, "4 / 4".to_string()),
        ]
    );
    let footer_rule = Pen {
        color: COLOR_BORDER,
        width: mm(0.1),
    };
    let rule_pages: Vec<_> = common::lines_with(&rec, footer_rule)
        .map(|(p, ..)| p)
        .collect();
    assert_eq!(rule_pages, [1, 2, 3, 4]);
}

#[test]
fn toc_links_point_at_anchor_pages() {
    let mut rec = common::a4();
    let report = common::render(&mut rec, &three_messages());
    let toc = report.toc_page.unwrap();

    let targets = toc_targets(&rec, toc);
    let expected: Vec<usize> = report
        .anchors
        .iter()
        .flat_map(|a| [a.page, a.page])
        .collect();
    assert_eq!(targets, expected);

    for anchor in &report.anchors {
        let label = format!("p.{}", anchor.page);
        assert!(
            rec.texts()
                .any(|(page, _, _, text, _)| page == toc && text == label)
        );
    }
}

#[test]
fn outline_nests_answers_under_questions() {
    let mut rec = common::a4();
    let report = common::render(&mut rec, &three_messages());
    assert!(report.outline_installed);

    let outline = rec.outline.expect("outline installed");
    assert_eq!(outline.len(), 2);
    assert_eq!(outline[0].title, "1. Human");
    assert_eq!(outline[0].children.len(), 1);
    assert_eq!(outline[0].children[0].title, "2. Assistant");
    assert_eq!(outline[1].title, "3. Human");
    assert_eq!(outline[1].page, 3);
}

#[test]
fn missing_outline_support_is_not_an_error() {
    let mut rec = common::a4().without_outline();
    let report = common::render(&mut rec, &three_messages());
    assert!(!report.outline_installed);
    assert!(rec.outline.is_none());
    assert_eq!(report.pages, 4);
}

#[test]
fn single_message_has_no_toc() {
    let mut rec = common::a4();
    let report = common::render(&mut rec, &common::transcript(vec![common::human("Just one")]));
    assert_eq!(report.pages, 1);
    assert_eq!(report.toc_page, None);
    assert_eq!(report.toc_entries, 0);
    assert_eq!(rec.page_of_text("Table of Contents"), None);
    assert_eq!(common::page_counters(&rec), [(1, "1 / 1".to_string())]);
}

#[test]
fn assistant_replies_do_not_force_a_page() {
    let mut rec = common::a4();
    let report = common::render(
        &mut rec,
        &common::transcript(vec![
            common::human("q"),
            common::assistant("a"),
            common::assistant("b"),
        ]),
    );
    let pages: Vec<_> = report.anchors.iter().map(|a| a.page).collect();
    assert_eq!(pages, [1, 1, 1]);
    assert_eq!(report.toc_page, Some(2));
}

#[test]
fn page_limit_aborts_the_export() {
    let mut rec = common::a4().with_page_limit(2);
    let err = render_transcript(
        &mut rec,
        &three_messages(),
        &common::all_enabled(),
        common::STAMP,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Pdf(_)));
}

#[test]
fn empty_transcript_is_rejected() {
    let mut rec = common::a4();
    let err = render_transcript(
        &mut rec,
        &common::transcript(Vec::new()),
        &ExportConfig::default(),
        common::STAMP,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(rec.ops.is_empty());
}

#[test]
fn toggles_hide_optional_sections() {
    let mut answer = common::assistant("Answer");
    answer.thinking = Some("pondering".into());
    answer.timestamp = Some("2026-01-01 10:00".into());
    answer.tools.push(ToolCall {
        name: Some("search".into()),
        input: serde_json::json!({"q": "rust"}),
        output: None,
    });
    let transcript = common::transcript(vec![common::human("Q"), answer]);

    let mut rec = common::a4();
    common::render(&mut rec, &transcript);
    assert!(rec.page_of_text("pondering").is_some());
    assert!(rec.page_of_text("2026-01-01 10:00").is_some());
    assert!(rec.page_of_text("Tool: search").is_some());
    assert!(rec.page_of_text("Output: N/A").is_some());

    let config = ExportConfig {
        include_thinking: false,
        include_tools: false,
        ..ExportConfig::default()
    };
    let mut rec = common::a4();
    render_transcript(&mut rec, &transcript, &config, common::STAMP).unwrap();
    assert_eq!(rec.page_of_text("pondering"), None);
    assert_eq!(rec.page_of_text("2026-01-01 10:00"), None);
    assert_eq!(rec.page_of_text("Tool: search"), None);
    assert!(rec.page_of_text("Answer").is_some());
}

#[test]
fn branch_points_are_marked() {
    let mut question = common::human("Which way?");
    question.branch_info = Some(BranchInfo {
        is_branch_point: true,
        child_count: 2,
    });
    let transcript = common::transcript(vec![question, common::assistant("Left")]);

    let mut rec = common::a4();
    let report = common::render(&mut rec, &transcript);
    assert!(rec.page_of_text("1. Human [Branch 2]").is_some());
    assert_eq!(report.anchors[0].sender, Sender::Human);
    let toc = report.toc_page.unwrap();
    assert!(
        rec.texts()
            .any(|(page, _, _, text, _)| page == toc && text == "1. Human [Branch 2]")
    );
}

#[test]
fn dry_run_matches_recorded_layout() {
    let transcript = three_messages();
    let report = transcript_pdf::dry_run(&transcript, &common::all_enabled()).unwrap();
    assert_eq!(report.pages, 4);
    assert_eq!(report.toc_entries, 3);
}

#[test]
fn filenames_are_sanitized() {
    let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
    let meta = Meta {
        name: Some("My chat: 2026/01".into()),
        platform: Some("ChatGPT".into()),
        ..Meta::default()
    };
    assert_eq!(
        export_filename(&meta, date),
        "chatgpt_My_chat__2026_01_2026-01-05.pdf"
    );

    let meta = Meta {
        name: Some("测试 notes".into()),
        ..Meta::default()
    };
    assert_eq!(export_filename(&meta, date), "claude_测试_notes_2026-01-05.pdf");
    assert_eq!(
        export_filename(&Meta::default(), date),
        "claude_conversation_2026-01-05.pdf"
    );
}

#[test]
fn platform_prefixes() {
    assert_eq!(platform_prefix(Some("Google Gemini")), "gemini");
    assert_eq!(platform_prefix(Some("SillyTavern")), "sillytavern");
    assert_eq!(platform_prefix(Some("claude.ai")), "claude");
    assert_eq!(platform_prefix(None), "claude");
}
