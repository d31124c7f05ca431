//! Fenced code blocks: language chip, numbered lines, shaded box that keeps
//! going across page breaks and a border drawn per page once the block ends.

use crate::error::Error;
use crate::fonts::FontVariant;
use crate::surface::{Area, Pen, Rgb, Surface, TextStyle};

use super::cursor::{BlockSpan, EdgeRole, SpanSlice};
use super::markup::parse_code_line;
use super::{COLOR_BORDER, LINE_HEIGHT, Layout, SECTION_SPACING, SIZE_CODE, SIZE_TIMESTAMP, mm};

const GUTTER_WIDTH: f32 = mm(8.0);
const PADDING: f32 = mm(3.0);
const CORNER_RADIUS: f32 = mm(1.5);
/// Room a code line needs below the cursor before it breaks to a new page.
const LINE_ROOM: f32 = mm(9.0);
const TAB: &str = "    ";

const COLOR_CODE_BG: Rgb = [248, 248, 248];
const COLOR_CODE_TEXT: Rgb = [50, 50, 50];
const COLOR_CODE_HEADING: Rgb = [20, 20, 20];
const COLOR_LINE_NUMBER: Rgb = [150, 150, 150];
const COLOR_GUTTER: Rgb = [220, 220, 220];
const COLOR_LABEL: Rgb = [100, 100, 100];
const COLOR_LABEL_BG: Rgb = [220, 220, 220];

/// Font size of `#` pseudo-headings inside code, by level.
const CODE_HEADING_SIZES: [f32; 6] = [14.0, 13.0, 12.0, 11.0, 10.0, 10.0];

/// One visual line of a code block. Only the first fragment of a source line
/// carries its number.
#[derive(Clone, Debug, PartialEq)]
pub struct WrappedLine {
    pub text: String,
    pub line_number: Option<usize>,
}

/// Wrap every source line of `code` to `width`, numbering source lines from 1.
pub fn wrap_code(
    layout: &mut Layout,
    code: &str,
    width: f32,
    style: &TextStyle,
) -> Vec<WrappedLine> {
    let mut out = Vec::new();
    for (idx, line) in code.split('\n').enumerate() {
        let line = line.replace('\t', TAB);
        let fragments = if line.is_empty() {
            vec![String::new()]
        } else {
            layout.split(&line, width, style)
        };
        for (i, text) in fragments.into_iter().enumerate() {
            out.push(WrappedLine {
                text,
                line_number: (i == 0).then_some(idx + 1),
            });
        }
    }
    out
}

fn draw_language_label(layout: &mut Layout, language: &str) {
    let left = layout.geometry().margin_left;
    let style = layout.style(FontVariant::Regular, SIZE_TIMESTAMP, COLOR_LABEL);
    let label = language.to_uppercase();
    let width = layout.measure(&label, &style) + mm(4.0);
    let y = layout.cursor.y;
    layout.surface.fill_rounded_rect(
        Area::new(left, y - mm(3.0), width, mm(5.0)),
        mm(1.0),
        COLOR_LABEL_BG,
    );
    layout.surface.draw_text(&label, left + mm(2.0), y, &style);
    layout.cursor.advance(LINE_HEIGHT * 1.2);
}

fn draw_code_line(layout: &mut Layout, line: &WrappedLine, text_x: f32) {
    let left = layout.geometry().margin_left;
    let y = layout.cursor.y;

    if let Some(n) = line.line_number {
        let style = layout.style(FontVariant::Regular, SIZE_CODE - 1.0, COLOR_LINE_NUMBER);
        layout
            .surface
            .draw_text(&format!("{n:>3}"), left + mm(1.0), y, &style);
    }
    if line.text.is_empty() {
        return;
    }

    let parsed = parse_code_line(&line.text);
    let mut x = text_x;
    for piece in &parsed.pieces {
        if piece.text.is_empty() {
            continue;
        }
        let style = match parsed.heading {
            Some(level) => layout.style(
                FontVariant::Bold,
                CODE_HEADING_SIZES[usize::from(level.clamp(1, 6)) - 1],
                COLOR_CODE_HEADING,
            ),
            None if piece.bold => layout.style(FontVariant::Bold, SIZE_CODE, COLOR_CODE_TEXT),
            None => layout.style(FontVariant::Regular, SIZE_CODE, COLOR_CODE_TEXT),
        };
        layout.surface.draw_text(&piece.text, x, y, &style);
        x += layout.measure(&piece.text, &style);
    }
}

/// Border strokes for one page of the block.
fn stroke_border(surface: &mut dyn Surface, slice: &SpanSlice, left: f32, width: f32) {
    let pen = Pen {
        color: COLOR_BORDER,
        width: mm(0.3),
    };
    let right = left + width;
    if slice.role == EdgeRole::Only {
        surface.stroke_rounded_rect(
            Area::new(left, slice.top, width, slice.bottom - slice.top),
            CORNER_RADIUS,
            pen,
        );
    } else {
        surface.stroke_line((left, slice.top), (left, slice.bottom), pen);
        surface.stroke_line((right, slice.top), (right, slice.bottom), pen);
        if slice.role.has_top() {
            surface.stroke_line((left, slice.top), (right, slice.top), pen);
        }
        if slice.role.has_bottom() {
            surface.stroke_line((left, slice.bottom), (right, slice.bottom), pen);
        }
    }

    let gutter = Pen {
        color: COLOR_GUTTER,
        width: mm(0.2),
    };
    let x = left + GUTTER_WIDTH;
    surface.stroke_line((x, slice.top), (x, slice.bottom), gutter);
}

/// Render a code block at the cursor. Returns the pages and extent the block
/// ended up covering.
pub fn render_code_block(
    layout: &mut Layout,
    code: &str,
    language: &str,
) -> Result<BlockSpan, Error> {
    let geo = layout.geometry();
    let max_width = geo.content_width();
    let code_width = max_width - GUTTER_WIDTH - mm(8.0);
    let text_x = geo.margin_left + GUTTER_WIDTH + mm(2.0);
    let limit = geo.bottom_limit();

    layout.ensure_space(LINE_ROOM + 2.0 * SECTION_SPACING)?;
    if !language.is_empty() {
        draw_language_label(layout, language);
    }

    // The newline before the closing fence is not a source line.
    let code = code.strip_suffix('\n').unwrap_or(code);
    let code_style = layout.style(FontVariant::Regular, SIZE_CODE, COLOR_CODE_TEXT);
    let lines = wrap_code(layout, code, code_width, &code_style);

    let start_y = layout.cursor.y;
    let mut span = BlockSpan::open(&layout.cursor, start_y - PADDING);
    let first_height = (lines.len() as f32 * LINE_HEIGHT + 2.0 * PADDING).min(limit - start_y);
    layout.surface.fill_rect(
        Area::new(geo.margin_left, start_y - PADDING, max_width, first_height),
        COLOR_CODE_BG,
    );

    for (index, line) in lines.iter().enumerate() {
        if layout.ensure_space(LINE_ROOM)? {
            let top = layout.cursor.y;
            let remaining = (lines.len() - index) as f32 * LINE_HEIGHT + PADDING;
            layout.surface.fill_rect(
                Area::new(geo.margin_left, top - PADDING, max_width, remaining.min(limit - top)),
                COLOR_CODE_BG,
            );
        }
        draw_code_line(layout, line, text_x);
        layout.cursor.advance(LINE_HEIGHT);
    }
    span.close(&layout.cursor, layout.cursor.y + PADDING);

    {
        let mut focus = layout.focus(span.start_page);
        for slice in span.slices(geo.margin_top - PADDING, limit) {
            focus.switch(slice.page);
            stroke_border(&mut *focus, &slice, geo.margin_left, max_width);
        }
    }
    log::debug!(
        "Code block: {} lines on pages {}..={}",
        lines.len(),
        span.start_page,
        span.end_page
    );

    layout.cursor.space_after(SECTION_SPACING);
    Ok(span)
}
