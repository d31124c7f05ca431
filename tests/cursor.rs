mod common;

use proptest::prelude::*;

use transcript_pdf::Error;
use transcript_pdf::layout::blocks::{render_markdown, render_section};
use transcript_pdf::layout::code::render_code_block;
use transcript_pdf::layout::cursor::{BlockSpan, Cursor, EdgeRole};
use transcript_pdf::layout::{Layout, mm};
use transcript_pdf::surface::Surface;

#[test]
fn ensure_space_is_a_noop_when_content_fits() {
    let mut rec = common::a4();
    let mut cursor = Cursor::new(common::a4_geometry());
    cursor.advance(100.0);
    assert!(!cursor.ensure_space(&mut rec, 50.0).unwrap());
    assert_eq!(cursor.page, 1);
    assert_eq!(cursor.y, cursor.geometry.margin_top + 100.0);
    assert_eq!(rec.page_count(), 1);
}

#[test]
fn ensure_space_breaks_at_the_bottom_limit() {
    let mut rec = common::a4();
    let geo = common::a4_geometry();
    let mut cursor = Cursor::new(geo);
    cursor.y = geo.bottom_limit() - 10.0;

    assert!(!cursor.ensure_space(&mut rec, 10.0).unwrap(), "exact fit stays");
    assert!(cursor.ensure_space(&mut rec, 10.5).unwrap());
    assert_eq!(cursor.page, 2);
    assert_eq!(cursor.y, geo.margin_top);
    assert_eq!(cursor.breaks(), 1);
    assert_eq!(rec.page_count(), 2);
    assert_eq!(rec.current_page(), 2);
}

#[test]
fn a_fresh_page_is_never_abandoned() {
    let mut rec = common::a4();
    let mut cursor = Cursor::new(common::a4_geometry());
    assert!(!cursor.ensure_space(&mut rec, 10_000.0).unwrap());
    assert_eq!(rec.page_count(), 1);
}

#[test]
fn trailing_space_stops_at_the_bottom_limit() {
    let mut rec = common::a4();
    let geo = common::a4_geometry();
    let mut cursor = Cursor::new(geo);
    cursor.y = geo.bottom_limit() - 5.0;
    cursor.space_after(20.0);
    assert_eq!(cursor.y, geo.bottom_limit());
    assert!(cursor.ensure_space(&mut rec, 1.0).unwrap());
    assert_eq!(cursor.page, 2);

    cursor.space_after(20.0);
    assert_eq!(cursor.y, geo.margin_top + 20.0);
}

#[test]
fn code_block_ending_near_the_bottom_leaves_the_cursor_on_the_page() {
    let mut rec = common::a4();
    let geo = common::a4_geometry();
    let mut layout = Layout::new(&mut rec);
    // Room for the opening check and four code lines, not five.
    layout.cursor.y = geo.bottom_limit() - mm(26.0);
    let span = render_code_block(&mut layout, "a\nb\nc\nd", "").unwrap();
    assert_eq!((span.start_page, span.end_page), (1, 1));
    assert_eq!(layout.cursor.y, geo.bottom_limit());

    render_markdown(&mut layout, "next").unwrap();
    assert_eq!(layout.cursor.page, 2);
    assert_eq!(rec.page_of_text("next"), Some(2));
}

#[test]
fn new_pages_are_appended_after_the_last_page() {
    let mut rec = common::a4();
    rec.add_page().unwrap();
    rec.add_page().unwrap();
    rec.set_page(1);

    let mut cursor = Cursor::new(common::a4_geometry());
    cursor.new_page(&mut rec).unwrap();
    assert_eq!(cursor.page, 4);
    assert_eq!(rec.page_count(), 4);
}

#[test]
fn page_limit_is_fatal() {
    let mut rec = common::a4().with_page_limit(1);
    let geo = common::a4_geometry();
    let mut cursor = Cursor::new(geo);
    cursor.y = geo.bottom_limit();
    let err = cursor.ensure_space(&mut rec, 20.0).unwrap_err();
    assert!(matches!(err, Error::Pdf(_)));
}

#[test]
fn focus_returns_to_the_last_page() {
    let mut rec = common::a4();
    rec.add_page().unwrap();
    rec.add_page().unwrap();
    {
        let mut layout = Layout::new(&mut rec);
        let mut focus = layout.focus(1);
        assert_eq!(focus.current_page(), 1);
        focus.switch(2);
        assert_eq!(focus.current_page(), 2);
    }
    assert_eq!(rec.current_page(), 3);
}

#[test]
fn span_roles_per_page() {
    let single = BlockSpan {
        start_page: 3,
        start_y: 100.0,
        end_page: 3,
        end_y: 200.0,
    };
    let slices = single.slices(40.0, 770.0);
    assert_eq!(slices.len(), 1);
    assert_eq!(slices[0].role, EdgeRole::Only);
    assert_eq!((slices[0].top, slices[0].bottom), (100.0, 200.0));

    let long = BlockSpan {
        start_page: 2,
        start_y: 500.0,
        end_page: 5,
        end_y: 120.0,
    };
    let slices = long.slices(40.0, 770.0);
    let roles: Vec<_> = slices.iter().map(|s| s.role).collect();
    assert_eq!(
        roles,
        [EdgeRole::First, EdgeRole::Middle, EdgeRole::Middle, EdgeRole::Last]
    );
    assert_eq!((slices[0].top, slices[0].bottom), (500.0, 770.0));
    assert_eq!((slices[1].top, slices[1].bottom), (40.0, 770.0));
    assert_eq!((slices[3].top, slices[3].bottom), (40.0, 120.0));

    assert!(EdgeRole::First.has_top() && !EdgeRole::First.has_bottom());
    assert!(!EdgeRole::Middle.has_top() && !EdgeRole::Middle.has_bottom());
    assert!(!EdgeRole::Last.has_top() && EdgeRole::Last.has_bottom());
    assert!(EdgeRole::Only.has_top() && EdgeRole::Only.has_bottom());
}

proptest! {
    #[test]
    fn pages_only_grow_and_y_stays_on_the_page(heights in prop::collection::vec(1.0f32..120.0, 1..200)) {
        let mut rec = common::a4();
        let geo = common::a4_geometry();
        let mut cursor = Cursor::new(geo);

        for h in heights {
            let page_before = cursor.page;
            let broke = cursor.ensure_space(&mut rec, h).unwrap();
            prop_assert!(cursor.page >= page_before);
            prop_assert_eq!(broke, cursor.page != page_before);
            if broke {
                prop_assert_eq!(cursor.y, geo.margin_top);
            }
            cursor.advance(h);
            prop_assert!(cursor.y <= geo.bottom_limit());
        }
        prop_assert_eq!(cursor.page, rec.page_count());
        prop_assert_eq!(cursor.breaks() + 1, rec.page_count());
    }

    #[test]
    fn renderers_leave_the_cursor_above_the_bottom_limit(
        start in 0.0f32..1.0,
        code_lines in 1usize..60,
        section_lines in 1usize..40,
        blanks in 1usize..6,
    ) {
        let mut rec = common::a4();
        let geo = common::a4_geometry();
        let mut layout = Layout::new(&mut rec);
        layout.cursor.y = geo.margin_top + start * (geo.bottom_limit() - geo.margin_top);

        let code = (1..=code_lines).map(|i| format!("x{i} = {i}")).collect::<Vec<_>>().join("\n");
        render_code_block(&mut layout, &code, "py").unwrap();
        prop_assert!(layout.cursor.y <= geo.bottom_limit());

        let content = (1..=section_lines).map(|i| format!("step {i}")).collect::<Vec<_>>().join("\n");
        render_section(&mut layout, "Thinking", &content).unwrap();
        prop_assert!(layout.cursor.y <= geo.bottom_limit());

        let prose = format!("## Heading\nsome text{}> quoted\n>\n> more", "\n".repeat(blanks + 1));
        render_markdown(&mut layout, &prose).unwrap();
        prop_assert!(layout.cursor.y <= geo.bottom_limit());
        prop_assert_eq!(layout.cursor.page, layout.surface.page_count());
    }
}
