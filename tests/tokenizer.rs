use proptest::prelude::*;

use transcript_pdf::layout::markup::{
    BodyPart, LineKind, ListMarker, SegmentKind, StyledSegment, classify_line, parse_code_line,
    split_fenced, tokenize,
};

fn kinds(segments: &[StyledSegment]) -> Vec<SegmentKind> {
    segments.iter().map(|s| s.kind).collect()
}

fn texts(segments: &[StyledSegment]) -> Vec<&str> {
    segments.iter().map(|s| s.text.as_str()).collect()
}

#[test]
fn mixed_line_yields_seven_segments() {
    let segments = tokenize("**bold** and *italic* and `code` and [link](http://x)");
    assert_eq!(
        kinds(&segments),
        [
            SegmentKind::Bold,
            SegmentKind::Plain,
            SegmentKind::Italic,
            SegmentKind::Plain,
            SegmentKind::Code,
            SegmentKind::Plain,
            SegmentKind::Link,
        ]
    );
    assert_eq!(
        texts(&segments),
        ["bold", " and ", "italic", " and ", "code", " and ", "link"]
    );
    assert_eq!(segments[6].url.as_deref(), Some("http://x"));
}

#[test]
fn bold_italic_and_underscores() {
    let segments = tokenize("***both*** __strong__ _soft_");
    assert_eq!(
        kinds(&segments),
        [
            SegmentKind::BoldItalic,
            SegmentKind::Plain,
            SegmentKind::Bold,
            SegmentKind::Plain,
            SegmentKind::Italic,
        ]
    );
    assert_eq!(texts(&segments), ["both", " ", "strong", " ", "soft"]);
}

#[test]
fn code_wins_over_emphasis_inside_it() {
    let segments = tokenize("`a *b* c` rest");
    assert_eq!(segments[0].kind, SegmentKind::Code);
    assert_eq!(segments[0].text, "a *b* c");
    assert_eq!(segments[1].text, " rest");
}

#[test]
fn dangling_markers_do_not_swallow_the_line() {
    let segments = tokenize("**unclosed bold and `code`");
    assert_eq!(kinds(&segments), [SegmentKind::Plain, SegmentKind::Code]);
    assert_eq!(segments[0].text, "unclosed bold and ");

    let segments = tokenize("2 * 3 = 6 and snake_case_name");
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].text, "2 * 3 = 6 and snake_case_name");
}

#[test]
fn intraword_and_bracketed_stars_are_literal() {
    let segments = tokenize("2*3=6 and f(*args)");
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].kind, SegmentKind::Plain);
    assert_eq!(segments[0].text, "2*3=6 and f(*args)");

    let segments = tokenize("a*b*c but *real*");
    assert_eq!(kinds(&segments), [SegmentKind::Plain, SegmentKind::Italic]);
    assert_eq!(texts(&segments), ["a*b*c but ", "real"]);
}

#[test]
fn heading_line_keeps_inner_bold() {
    let segments = tokenize("## Setup **fast** path");
    assert_eq!(
        kinds(&segments),
        [
            SegmentKind::Heading(2),
            SegmentKind::Bold,
            SegmentKind::Heading(2),
        ]
    );
    assert_eq!(texts(&segments), ["Setup ", "fast", " path"]);
    assert_eq!(segments[0].span.start, 0);
}

#[test]
fn empty_line_has_no_segments() {
    assert!(tokenize("").is_empty());
}

#[test]
fn link_without_url_stays_text() {
    let segments = tokenize("see [docs] and [x]()");
    assert!(segments.iter().all(|s| s.kind == SegmentKind::Plain));
}

#[test]
fn code_line_headings_and_bold() {
    let line = parse_code_line("### Section");
    assert_eq!(line.heading, Some(3));
    assert_eq!(line.pieces[0].text, "Section");

    let line = parse_code_line("call(**important**, x)");
    assert_eq!(line.heading, None);
    let pieces: Vec<_> = line.pieces.iter().map(|p| (p.text.as_str(), p.bold)).collect();
    assert_eq!(pieces, [("call(", false), ("important", true), (", x)", false)]);

    let line = parse_code_line("x ** 2");
    assert_eq!(line.pieces.len(), 1);
    assert_eq!(line.pieces[0].text, "x ** 2");
}

#[test]
fn fenced_blocks_split_from_prose() {
    let parts = split_fenced("Intro\n```py\nprint(1)\n```\nOutro");
    assert_eq!(
        parts,
        [
            BodyPart::Text("Intro\n".into()),
            BodyPart::Code {
                language: "py".into(),
                content: "print(1)\n".into(),
            },
            BodyPart::Text("\nOutro".into()),
        ]
    );
}

#[test]
fn unterminated_fence_stays_prose() {
    let parts = split_fenced("before\n```rust\nfn main() {}");
    assert_eq!(parts.len(), 1);
    assert!(matches!(&parts[0], BodyPart::Text(t) if t.contains("fn main")));
}

#[test]
fn line_classification() {
    assert_eq!(classify_line("   "), LineKind::Blank);
    assert_eq!(
        classify_line("# Title"),
        LineKind::Heading {
            level: 1,
            line: "# Title"
        }
    );
    assert_eq!(classify_line("> quoted"), LineKind::Quote("quoted"));
    assert_eq!(
        classify_line("    - nested"),
        LineKind::ListItem {
            depth: 4,
            marker: ListMarker::Bullet,
            text: "nested"
        }
    );
    assert_eq!(
        classify_line("12. twelfth"),
        LineKind::ListItem {
            depth: 0,
            marker: ListMarker::Ordered(12),
            text: "twelfth"
        }
    );
    assert_eq!(classify_line("-not a list"), LineKind::Paragraph("-not a list"));
    assert_eq!(classify_line("#tag"), LineKind::Paragraph("#tag"));
}

/// One inline element: its markup and the text it renders as.
fn element() -> impl Strategy<Value = (String, String, SegmentKind)> {
    let word = "[a-z]{1,8}( [a-z]{1,8}){0,2}";
    prop_oneof![
        word.prop_map(|w| (w.clone(), w, SegmentKind::Plain)),
        word.prop_map(|w| (format!("**{w}**"), w, SegmentKind::Bold)),
        word.prop_map(|w| (format!("*{w}*"), w, SegmentKind::Italic)),
        word.prop_map(|w| (format!("_{w}_"), w, SegmentKind::Italic)),
        word.prop_map(|w| (format!("***{w}***"), w, SegmentKind::BoldItalic)),
        word.prop_map(|w| (format!("`{w}`"), w, SegmentKind::Code)),
        (word, "[a-z]{1,6}").prop_map(|(w, host)| (
            format!("[{w}](https://{host}.org)"),
            w,
            SegmentKind::Link
        )),
    ]
}

proptest! {
    #[test]
    fn spans_cover_the_line_without_overlap(line in "[a-z *_`\\[\\]()#>\\-]{1,60}") {
        let segments = tokenize(&line);
        prop_assert!(!segments.is_empty());
        prop_assert_eq!(segments[0].span.start, 0);
        prop_assert_eq!(segments[segments.len() - 1].span.end, line.len());
        for pair in segments.windows(2) {
            prop_assert_eq!(pair[0].span.end, pair[1].span.start);
        }
        for seg in &segments {
            prop_assert!(seg.span.start < seg.span.end);
        }
    }

    #[test]
    fn markup_strips_to_its_text(elements in prop::collection::vec(element(), 1..6)) {
        let line = elements.iter().map(|(m, _, _)| m.as_str()).collect::<Vec<_>>().join(" ");
        let segments = tokenize(&line);

        let rendered: String = segments.iter().map(|s| s.text.as_str()).collect();
        let expected = elements.iter().map(|(_, t, _)| t.as_str()).collect::<Vec<_>>().join(" ");
        prop_assert_eq!(&rendered, &expected);

        let styled: Vec<SegmentKind> = segments
            .iter()
            .map(|s| s.kind)
            .filter(|k| *k != SegmentKind::Plain)
            .collect();
        let wanted: Vec<SegmentKind> = elements
            .iter()
            .map(|(_, _, k)| *k)
            .filter(|k| *k != SegmentKind::Plain)
            .collect();
        prop_assert_eq!(styled, wanted);

        let again = tokenize(&rendered);
        prop_assert_eq!(again.len(), 1);
        prop_assert_eq!(&again[0].text, &rendered);
    }
}
