//! Greedy packing of styled segments into lines.

use crate::error::Error;
use crate::fonts::FontVariant;
use crate::surface::{Area, LinkTarget, Pen, TextStyle};

use super::markup::{SegmentKind, StyledSegment};
use super::{
    COLOR_INLINE_CODE, COLOR_INLINE_CODE_BG, COLOR_LINK, Layout, SIZE_CODE, line_advance, mm,
};

/// Horizontal slot text is laid into: `indent` from the left margin,
/// `width` wide, drawn in `base` unless a segment says otherwise.
#[derive(Clone, Copy, Debug)]
pub struct Frame {
    pub indent: f32,
    pub width: f32,
    pub base: TextStyle,
}

impl Frame {
    pub fn new(indent: f32, width: f32, base: TextStyle) -> Self {
        Frame {
            indent,
            width,
            base,
        }
    }
}

/// Punctuation that must not begin a line.
const NO_LINE_START: &[char] = &[
    '。', '，', '、', '；', '：', '！', '？', '）', '》', '」', '』', '】', ',', '.', ';', ':', '!',
    '?', ')', '}', ']',
];
/// Punctuation that must not end a line.
const NO_LINE_END: &[char] = &['（', '《', '「', '『', '【', '(', '[', '{'];

/// Style a segment is drawn in, relative to the frame's base style.
pub fn segment_style(layout: &Layout, kind: SegmentKind, base: &TextStyle) -> TextStyle {
    match kind {
        SegmentKind::Plain | SegmentKind::Heading(_) => *base,
        SegmentKind::Bold => layout.emphasis(FontVariant::Bold, base.size, base.color),
        SegmentKind::Italic => layout.emphasis(FontVariant::Italic, base.size, base.color),
        SegmentKind::BoldItalic => layout.emphasis(FontVariant::BoldItalic, base.size, base.color),
        SegmentKind::Code => TextStyle::new(FontVariant::Mono, SIZE_CODE, COLOR_INLINE_CODE),
        SegmentKind::Link => {
            let variant = if layout.surface.font_variants().contains(&FontVariant::Light) {
                FontVariant::Light
            } else {
                FontVariant::Regular
            };
            layout.style(variant, base.size, COLOR_LINK)
        }
    }
}

/// Split into words with their trailing spaces attached. Leading spaces form
/// their own piece.
fn word_pieces(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_space = text.starts_with(' ');
    for (i, ch) in text.char_indices() {
        if ch == ' ' {
            in_space = true;
        } else if in_space {
            if i > start {
                pieces.push(&text[start..i]);
            }
            start = i;
            in_space = false;
        }
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

struct Placed {
    x: f32,
    text: String,
    width: f32,
    style: TextStyle,
    kind: SegmentKind,
    url: Option<String>,
}

/// A line under construction.
struct LineBuf {
    pieces: Vec<Placed>,
    x: f32,
}

impl LineBuf {
    fn new() -> Self {
        LineBuf {
            pieces: Vec::new(),
            x: 0.0,
        }
    }

    fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    fn push(&mut self, text: &str, width: f32, style: TextStyle, seg: &StyledSegment) {
        if let Some(last) = self.pieces.last_mut()
            && last.kind == seg.kind
            && last.style == style
            && last.url == seg.url
        {
            last.text.push_str(text);
            last.width += width;
        } else {
            self.pieces.push(Placed {
                x: self.x,
                text: text.to_string(),
                width,
                style,
                kind: seg.kind,
                url: seg.url.clone(),
            });
        }
        self.x += width;
    }
}

/// Move break-averse punctuation across sub-line boundaries, as long as the
/// receiving line still fits.
pub fn apply_line_break_rules(
    layout: &mut Layout,
    mut lines: Vec<String>,
    max_width: f32,
    style: &TextStyle,
) -> Vec<String> {
    for i in 1..lines.len() {
        if let Some(c) = lines[i].chars().next().filter(|c| NO_LINE_START.contains(c)) {
            let candidate = format!("{}{c}", lines[i - 1]);
            if layout.measure(&candidate, style) <= max_width {
                lines[i - 1] = candidate;
                lines[i].remove(0);
            }
        } else if let Some(c) = lines[i - 1].chars().last().filter(|c| NO_LINE_END.contains(c)) {
            let candidate = format!("{c}{}", lines[i]);
            if layout.measure(&candidate, style) <= max_width {
                lines[i - 1].pop();
                lines[i] = candidate;
            }
        }
    }
    lines.retain(|l| !l.is_empty());
    lines
}

/// Draw the pending line at the cursor and advance one line.
fn flush(layout: &mut Layout, line: &mut LineBuf, frame: &Frame) -> Result<(), Error> {
    if line.is_empty() {
        return Ok(());
    }
    let size = line
        .pieces
        .iter()
        .map(|p| p.style.size)
        .fold(frame.base.size, f32::max);
    let advance = line_advance(size);
    layout.ensure_space(advance)?;

    let y = layout.cursor.y;
    let left = layout.geometry().margin_left + frame.indent;
    for p in line.pieces.drain(..) {
        let x = left + p.x;
        match p.kind {
            SegmentKind::Code => {
                layout.surface.fill_rect(
                    Area::new(x - mm(1.0), y - mm(3.0), p.width + mm(2.0), mm(4.0)),
                    COLOR_INLINE_CODE_BG,
                );
                layout.surface.draw_text(&p.text, x, y, &p.style);
            }
            SegmentKind::Link => {
                let visible = p.text.trim_end();
                let width = if visible.len() == p.text.len() {
                    p.width
                } else {
                    layout.measure(visible, &p.style)
                };
                layout.surface.draw_text(visible, x, y, &p.style);
                layout.surface.stroke_line(
                    (x, y + mm(0.5)),
                    (x + width, y + mm(0.5)),
                    Pen {
                        color: p.style.color,
                        width: 0.5,
                    },
                );
                if let Some(url) = p.url {
                    layout.surface.add_link(
                        Area::new(x, y - p.style.size * 0.8, width, p.style.size),
                        LinkTarget::Uri(url),
                    );
                }
            }
            _ => layout.surface.draw_text(&p.text, x, y, &p.style),
        }
    }
    line.x = 0.0;
    layout.cursor.advance(advance);
    Ok(())
}

/// A piece too wide for an empty line: wrap it on its own, flush every
/// sub-line but the last and leave the last on the line buffer.
fn place_oversized(
    layout: &mut Layout,
    line: &mut LineBuf,
    frame: &Frame,
    piece: &str,
    style: TextStyle,
    seg: &StyledSegment,
) -> Result<usize, Error> {
    let visible = piece.trim_end();
    let trailing = &piece[visible.len()..];
    let sub_lines = layout.split(visible, frame.width, &style);
    let sub_lines = apply_line_break_rules(layout, sub_lines, frame.width, &style);
    let Some((last, head)) = sub_lines.split_last() else {
        return Ok(0);
    };
    for sub in head {
        let w = layout.measure(sub, &style);
        line.push(sub, w, style, seg);
        flush(layout, line, frame)?;
    }
    let tail = format!("{last}{trailing}");
    let w = layout.measure(&tail, &style);
    line.push(&tail, w, style, seg);
    Ok(head.len())
}

/// Lay `segments` out as greedily packed lines inside `frame`, breaking
/// pages through the cursor. Returns the number of lines drawn.
pub fn render_segments(
    layout: &mut Layout,
    segments: &[StyledSegment],
    frame: &Frame,
) -> Result<usize, Error> {
    let mut line = LineBuf::new();
    let mut lines = 0;

    for seg in segments {
        if seg.text.is_empty() {
            continue;
        }
        let style = segment_style(layout, seg.kind, &frame.base);

        for piece in word_pieces(&seg.text) {
            let is_space = piece.trim().is_empty();
            if line.is_empty() && is_space {
                continue;
            }
            let width = layout.measure(piece, &style);
            let visible = piece.trim_end();
            let fit_width = if visible.len() == piece.len() {
                width
            } else {
                layout.measure(visible, &style)
            };

            if !line.is_empty() && line.x + fit_width > frame.width {
                flush(layout, &mut line, frame)?;
                lines += 1;
                if is_space {
                    continue;
                }
            }
            if line.is_empty() && fit_width > frame.width {
                lines += place_oversized(layout, &mut line, frame, piece, style, seg)?;
                continue;
            }
            line.push(piece, width, style, seg);
        }
    }

    if !line.is_empty() {
        flush(layout, &mut line, frame)?;
        lines += 1;
    }
    Ok(lines)
}
