//! Prose blocks: headings, quotes, list items, paragraphs and the titled
//! sections used for thinking, artifacts, tools, citations and attachments.

use crate::error::Error;
use crate::fonts::FontVariant;
use crate::surface::{Area, Pen, Rgb, TextStyle};

use super::cursor::BlockSpan;
use super::markup::{LineKind, ListMarker, classify_line, tokenize};
use super::wrap::{Frame, render_segments};
use super::{
    COLOR_SECTION_BG, COLOR_TEXT, LINE_HEIGHT, Layout, SECTION_SPACING, SIZE_BODY, SIZE_H2,
    line_advance, mm,
};

/// Font size per markdown heading level.
pub const HEADING_SIZES: [f32; 6] = [16.0, 14.0, 12.0, 11.0, 10.0, 10.0];

const QUOTE_INDENT: f32 = mm(6.0);
const QUOTE_RULE_X: f32 = mm(2.0);
const COLOR_QUOTE: Rgb = [100, 100, 100];
const COLOR_QUOTE_RULE: Rgb = [150, 150, 150];

/// Indent per leading space of a list line.
const LIST_INDENT_STEP: f32 = mm(2.0);

const SECTION_PADDING: f32 = mm(2.0);

pub fn heading_size(level: u8) -> f32 {
    let idx = usize::from(level.clamp(1, 6)) - 1;
    HEADING_SIZES[idx]
}

pub fn body_style(layout: &Layout) -> TextStyle {
    layout.style(FontVariant::Regular, SIZE_BODY, COLOR_TEXT)
}

/// Render prose line by line. Consecutive quote lines form one block.
pub fn render_markdown(layout: &mut Layout, text: &str) -> Result<(), Error> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut i = 0;
    while i < lines.len() {
        match classify_line(lines[i]) {
            LineKind::Blank => layout.cursor.space_after(LINE_HEIGHT * 0.5),
            LineKind::Heading { level, line } => render_heading(layout, line, level)?,
            LineKind::Quote(_) => {
                let mut quoted = Vec::new();
                while let Some(LineKind::Quote(q)) = lines.get(i).map(|l| classify_line(l)) {
                    quoted.push(q);
                    i += 1;
                }
                render_quote(layout, &quoted)?;
                continue;
            }
            LineKind::ListItem {
                depth,
                marker,
                text,
            } => render_list_item(layout, depth, marker, text)?,
            LineKind::Paragraph(line) => render_paragraph(layout, line)?,
        }
        i += 1;
    }
    Ok(())
}

/// A `#` heading line. Room for the heading plus one body line is reserved so
/// a heading never ends a page on its own.
pub fn render_heading(layout: &mut Layout, line: &str, level: u8) -> Result<(), Error> {
    let size = heading_size(level);
    layout.ensure_space(line_advance(size) + LINE_HEIGHT)?;
    let base = layout.emphasis(FontVariant::Bold, size, COLOR_TEXT);
    let frame = Frame::new(0.0, layout.geometry().content_width(), base);
    render_segments(layout, &tokenize(line), &frame)?;
    layout.cursor.space_after(LINE_HEIGHT * 0.5);
    Ok(())
}

/// Quoted lines, indented, with a rule down the left side on every page the
/// quote touches.
pub fn render_quote(layout: &mut Layout, lines: &[&str]) -> Result<(), Error> {
    let geo = layout.geometry();
    let base = layout.style(FontVariant::Regular, SIZE_BODY, COLOR_QUOTE);
    let frame = Frame::new(QUOTE_INDENT, geo.content_width() - mm(8.0), base);

    layout.ensure_space(line_advance(SIZE_BODY))?;
    let mut span = BlockSpan::open(&layout.cursor, layout.cursor.y - mm(2.0) - SIZE_BODY * 0.8);

    for line in lines {
        let segments = tokenize(line);
        if segments.is_empty() {
            layout.cursor.space_after(LINE_HEIGHT * 0.5);
            continue;
        }
        render_segments(layout, &segments, &frame)?;
    }
    span.close(&layout.cursor, layout.cursor.y - mm(2.0));

    let x = geo.margin_left + QUOTE_RULE_X;
    let pen = Pen {
        color: COLOR_QUOTE_RULE,
        width: mm(0.5),
    };
    let top = geo.margin_top - mm(2.0) - SIZE_BODY * 0.8;
    let mut focus = layout.focus(span.start_page);
    for slice in span.slices(top, geo.bottom_limit()) {
        focus.switch(slice.page);
        focus.stroke_line((x, slice.top), (x, slice.bottom), pen);
    }
    Ok(())
}

/// One list line: marker at the nesting indent, wrapped text aligned after it.
pub fn render_list_item(
    layout: &mut Layout,
    depth: usize,
    marker: ListMarker,
    text: &str,
) -> Result<(), Error> {
    let geo = layout.geometry();
    let style = body_style(layout);
    let marker = match marker {
        ListMarker::Bullet => "\u{2022}".to_string(),
        ListMarker::Ordered(n) => format!("{n}."),
    };
    let indent = depth as f32 * LIST_INDENT_STEP;

    layout.ensure_space(line_advance(style.size))?;
    let y = layout.cursor.y;
    layout
        .surface
        .draw_text(&marker, geo.margin_left + indent, y, &style);

    let text_indent = indent + layout.measure(&format!("{marker}  "), &style);
    let frame = Frame::new(text_indent, geo.content_width() - text_indent, style);
    if render_segments(layout, &tokenize(text), &frame)? == 0 {
        layout.cursor.advance(line_advance(style.size));
    }
    Ok(())
}

pub fn render_paragraph(layout: &mut Layout, line: &str) -> Result<(), Error> {
    let frame = Frame::new(0.0, layout.geometry().content_width(), body_style(layout));
    render_segments(layout, &tokenize(line), &frame)?;
    Ok(())
}

/// A shaded box with a bold title and plain wrapped content. The shading is
/// sized for the whole section up front and continued on every new page the
/// content runs onto.
pub fn render_section(layout: &mut Layout, title: &str, content: &str) -> Result<(), Error> {
    let geo = layout.geometry();
    let body = body_style(layout);
    let title_style = layout.emphasis(FontVariant::Bold, SIZE_H2, COLOR_TEXT);

    layout.ensure_space(line_advance(SIZE_H2) + 2.0 * SECTION_SPACING)?;
    let lines = layout.split(content, geo.content_width() - 2.0 * SECTION_PADDING, &body);

    fill_section(layout, lines.len() + 2);

    let x = geo.margin_left + SECTION_PADDING;
    layout
        .surface
        .draw_text(title, x, layout.cursor.y, &title_style);
    layout.cursor.advance(LINE_HEIGHT * 1.2);

    for (i, line) in lines.iter().enumerate() {
        if layout.ensure_space(LINE_HEIGHT)? {
            fill_section(layout, lines.len() - i + 1);
        }
        if !line.is_empty() {
            layout.surface.draw_text(line, x, layout.cursor.y, &body);
        }
        layout.cursor.advance(LINE_HEIGHT);
    }
    layout.cursor.space_after(SECTION_SPACING);
    Ok(())
}

/// Shade `rows` lines from the cursor down, clipped at the page bottom.
fn fill_section(layout: &mut Layout, rows: usize) {
    let geo = layout.geometry();
    let top = layout.cursor.y - mm(3.0);
    let height = (LINE_HEIGHT * rows as f32).min(geo.bottom_limit() - top).max(0.0);
    layout.surface.fill_rect(
        Area::new(geo.margin_left, top, geo.content_width(), height),
        COLOR_SECTION_BG,
    );
}

#[cfg(test)]
mod tests {
    use super::heading_size;

    #[test]
    fn heading_sizes_shrink_with_level() {
        assert_eq!(heading_size(1), 16.0);
        assert_eq!(heading_size(3), 12.0);
        assert_eq!(heading_size(6), 10.0);
        assert_eq!(heading_size(9), 10.0);
    }
}
