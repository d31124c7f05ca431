//! Drawing primitives the layout engine is written against.
//!
//! Coordinates are in points with a top-down y axis: `y` is the distance from
//! the top edge of the page, text is positioned by its baseline. Pages are
//! numbered from 1.

use crate::error::Error;
use crate::fonts::FontVariant;

pub type Rgb = [u8; 3];

/// Everything measurement and drawing need to know about a run of text.
/// Passed explicitly with every call; surfaces keep no "current font".
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub variant: FontVariant,
    pub size: f32,
    pub color: Rgb,
}

impl TextStyle {
    pub fn new(variant: FontVariant, size: f32, color: Rgb) -> Self {
        TextStyle {
            variant,
            size,
            color,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Area {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Area {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Area {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pen {
    pub color: Rgb,
    pub width: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LinkTarget {
    Uri(String),
    /// Internal jump to the top of a page (1-based).
    Page(usize),
}

/// One bookmark in the document outline.
#[derive(Clone, Debug, PartialEq)]
pub struct OutlineNode {
    pub title: String,
    pub page: usize,
    pub y: f32,
    pub children: Vec<OutlineNode>,
}

pub trait Surface {
    /// (width, height) of every page in points.
    fn page_size(&self) -> (f32, f32);
    fn page_count(&self) -> usize;
    fn current_page(&self) -> usize;
    /// Append a page at the end of the document and focus it.
    fn add_page(&mut self) -> Result<(), Error>;
    /// Focus an existing page. Out-of-range pages are ignored.
    fn set_page(&mut self, page: usize);
    /// Family variants that are actually backed by a font.
    fn font_variants(&self) -> &[FontVariant];
    fn measure_text(&mut self, text: &str, style: &TextStyle) -> Result<f32, Error>;

    /// Break `text` into lines no wider than `max_width`.
    fn split_to_width(
        &mut self,
        text: &str,
        max_width: f32,
        style: &TextStyle,
    ) -> Result<Vec<String>, Error> {
        split_greedy(self, text, max_width, style)
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle);
    fn fill_rect(&mut self, area: Area, color: Rgb);
    fn fill_rounded_rect(&mut self, area: Area, radius: f32, color: Rgb);
    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), pen: Pen);
    fn stroke_rounded_rect(&mut self, area: Area, radius: f32, pen: Pen);
    fn add_link(&mut self, area: Area, target: LinkTarget);

    /// Install the document outline. Returns false when the surface has no
    /// outline support.
    fn set_outline(&mut self, outline: Vec<OutlineNode>) -> bool {
        let _ = outline;
        false
    }
}

/// Greedy word wrap on top of `measure_text`. Newlines always break; a
/// paragraph that fits is returned as written. Otherwise runs of spaces
/// between words are kept and the run at a break is dropped; words wider than
/// the line are broken between characters. Leading spaces of each paragraph
/// are kept (code indentation) unless they eat half the line.
pub fn split_greedy<S: Surface + ?Sized>(
    surface: &mut S,
    text: &str,
    max_width: f32,
    style: &TextStyle,
) -> Result<Vec<String>, Error> {
    let space_w = surface.measure_text(" ", style)?;
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        if surface.measure_text(paragraph, style)? <= max_width {
            lines.push(paragraph.to_string());
            continue;
        }
        let body = paragraph.trim_start_matches(' ');
        let lead_len = paragraph.len() - body.len();
        let lead_w = lead_len as f32 * space_w;

        let mut line = String::new();
        let mut line_w = 0.0f32;
        if lead_w <= max_width / 2.0 {
            line.push_str(&paragraph[..lead_len]);
            line_w = lead_w;
        }
        let mut has_word = false;

        for (gap, word) in spaced_words(body) {
            let word_w = surface.measure_text(word, style)?;

            if has_word {
                let gap_w = gap.len() as f32 * space_w;
                if line_w + gap_w + word_w <= max_width {
                    line.push_str(gap);
                    line.push_str(word);
                    line_w += gap_w + word_w;
                    continue;
                }
                lines.push(std::mem::take(&mut line));
                line_w = 0.0;
            }

            if line_w + word_w <= max_width {
                line.push_str(word);
                line_w += word_w;
                has_word = true;
                continue;
            }

            for ch in word.chars() {
                let mut buf = [0u8; 4];
                let cw = surface.measure_text(ch.encode_utf8(&mut buf), style)?;
                if line_w + cw > max_width && line.chars().any(|c| c != ' ') {
                    lines.push(std::mem::take(&mut line));
                    line_w = 0.0;
                }
                line.push(ch);
                line_w += cw;
            }
            has_word = true;
        }
        lines.push(line);
    }
    Ok(lines)
}

/// Words paired with the run of spaces before them. Trailing spaces are
/// dropped.
fn spaced_words(text: &str) -> Vec<(&str, &str)> {
    let mut out = Vec::new();
    let mut rest = text;
    loop {
        let gap = rest.len() - rest.trim_start_matches(' ').len();
        let after = &rest[gap..];
        let word_len = after.find(' ').unwrap_or(after.len());
        if word_len == 0 {
            break;
        }
        out.push((&rest[..gap], &after[..word_len]));
        rest = &after[word_len..];
    }
    out
}

#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    Text {
        page: usize,
        x: f32,
        y: f32,
        text: String,
        style: TextStyle,
    },
    FillRect {
        page: usize,
        area: Area,
        color: Rgb,
        rounded: bool,
    },
    Line {
        page: usize,
        from: (f32, f32),
        to: (f32, f32),
        pen: Pen,
    },
    StrokeRoundedRect {
        page: usize,
        area: Area,
    },
    Link {
        page: usize,
        area: Area,
        target: LinkTarget,
    },
}

impl Op {
    pub fn page(&self) -> usize {
        match self {
            Op::Text { page, .. }
            | Op::FillRect { page, .. }
            | Op::Line { page, .. }
            | Op::StrokeRoundedRect { page, .. }
            | Op::Link { page, .. } => *page,
        }
    }
}

/// In-memory surface that records every primitive. Text width is a fixed
/// fraction of the font size per character, which keeps layout deterministic.
pub struct Recorder {
    pub ops: Vec<Op>,
    pub outline: Option<Vec<OutlineNode>>,
    width: f32,
    height: f32,
    pages: usize,
    current: usize,
    variants: Vec<FontVariant>,
    char_width: f32,
    outline_support: bool,
    page_limit: Option<usize>,
    fail_measure: Option<String>,
    fail_wrap: bool,
}

impl Recorder {
    pub fn new(width: f32, height: f32) -> Self {
        Recorder {
            ops: Vec::new(),
            outline: None,
            width,
            height,
            pages: 1,
            current: 1,
            variants: FontVariant::BUILTIN.to_vec(),
            char_width: 0.5,
            outline_support: true,
            page_limit: None,
            fail_measure: None,
            fail_wrap: false,
        }
    }

    pub fn with_variants(mut self, variants: &[FontVariant]) -> Self {
        self.variants = variants.to_vec();
        self
    }

    pub fn without_outline(mut self) -> Self {
        self.outline_support = false;
        self
    }

    /// Fail `add_page` once `limit` pages exist.
    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = Some(limit);
        self
    }

    /// Make `measure_text` fail for any text containing `needle`.
    #[doc(hidden)]
    pub fn failing_measure_on(mut self, needle: &str) -> Self {
        self.fail_measure = Some(needle.to_string());
        self
    }

    /// Make `split_to_width` fail unconditionally.
    #[doc(hidden)]
    pub fn failing_wrap(mut self) -> Self {
        self.fail_wrap = true;
        self
    }

    pub fn texts(&self) -> impl Iterator<Item = (usize, f32, f32, &str, &TextStyle)> {
        self.ops.iter().filter_map(|op| match op {
            Op::Text {
                page,
                x,
                y,
                text,
                style,
            } => Some((*page, *x, *y, text.as_str(), style)),
            _ => None,
        })
    }

    pub fn ops_on_page(&self, page: usize) -> impl Iterator<Item = &Op> {
        self.ops.iter().filter(move |op| op.page() == page)
    }

    /// First page holding a text op that contains `needle`.
    pub fn page_of_text(&self, needle: &str) -> Option<usize> {
        self.texts()
            .find(|(_, _, _, text, _)| text.contains(needle))
            .map(|(page, ..)| page)
    }

    pub fn char_width(&self) -> f32 {
        self.char_width
    }
}

impl Surface for Recorder {
    fn page_size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn page_count(&self) -> usize {
        self.pages
    }

    fn current_page(&self) -> usize {
        self.current
    }

    fn add_page(&mut self) -> Result<(), Error> {
        if let Some(limit) = self.page_limit
            && self.pages >= limit
        {
            return Err(Error::Pdf(format!("page limit of {limit} reached")));
        }
        self.pages += 1;
        self.current = self.pages;
        Ok(())
    }

    fn set_page(&mut self, page: usize) {
        if (1..=self.pages).contains(&page) {
            self.current = page;
        }
    }

    fn font_variants(&self) -> &[FontVariant] {
        &self.variants
    }

    fn measure_text(&mut self, text: &str, style: &TextStyle) -> Result<f32, Error> {
        if let Some(needle) = &self.fail_measure
            && text.contains(needle.as_str())
        {
            return Err(Error::Font(format!("no metrics for {text:?}")));
        }
        Ok(text.chars().count() as f32 * style.size * self.char_width)
    }

    fn split_to_width(
        &mut self,
        text: &str,
        max_width: f32,
        style: &TextStyle,
    ) -> Result<Vec<String>, Error> {
        if self.fail_wrap {
            return Err(Error::Font("wrap primitive unavailable".into()));
        }
        split_greedy(self, text, max_width, style)
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) {
        self.ops.push(Op::Text {
            page: self.current,
            x,
            y,
            text: text.to_string(),
            style: *style,
        });
    }

    fn fill_rect(&mut self, area: Area, color: Rgb) {
        self.ops.push(Op::FillRect {
            page: self.current,
            area,
            color,
            rounded: false,
        });
    }

    fn fill_rounded_rect(&mut self, area: Area, _radius: f32, color: Rgb) {
        self.ops.push(Op::FillRect {
            page: self.current,
            area,
            color,
            rounded: true,
        });
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), pen: Pen) {
        self.ops.push(Op::Line {
            page: self.current,
            from,
            to,
            pen,
        });
    }

    fn stroke_rounded_rect(&mut self, area: Area, _radius: f32, _pen: Pen) {
        self.ops.push(Op::StrokeRoundedRect {
            page: self.current,
            area,
        });
    }

    fn add_link(&mut self, area: Area, target: LinkTarget) {
        self.ops.push(Op::Link {
            page: self.current,
            area,
            target,
        });
    }

    fn set_outline(&mut self, outline: Vec<OutlineNode>) -> bool {
        if !self.outline_support {
            return false;
        }
        self.outline = Some(outline);
        true
    }
}
