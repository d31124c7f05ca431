//! Cursor-driven layout of a transcript onto a [`Surface`].

pub mod blocks;
pub mod code;
pub mod cursor;
pub mod document;
pub mod markup;
pub mod wrap;

use std::ops::{Deref, DerefMut};

use crate::error::Error;
use crate::fonts::{FontVariant, resolve_style};
use crate::surface::{Rgb, Surface, TextStyle};

use cursor::{Cursor, PageGeometry};

/// Millimetres to points.
pub const fn mm(v: f32) -> f32 {
    v * 72.0 / 25.4
}

pub const MARGIN_LEFT: f32 = mm(15.0);
pub const MARGIN_RIGHT: f32 = mm(15.0);
pub const MARGIN_TOP: f32 = mm(15.0);
pub const MARGIN_BOTTOM: f32 = mm(25.0);
pub const LINE_HEIGHT: f32 = mm(5.0);
pub const SECTION_SPACING: f32 = mm(8.0);
pub const MESSAGE_SPACING: f32 = mm(10.0);
pub const FOOTER_HEIGHT: f32 = mm(15.0);
/// Distance of the footer baseline from the bottom edge.
pub const FOOTER_BASELINE: f32 = mm(10.0);

pub const SIZE_TITLE: f32 = 20.0;
pub const SIZE_H1: f32 = 16.0;
pub const SIZE_H2: f32 = 14.0;
pub const SIZE_SENDER: f32 = 12.0;
pub const SIZE_BODY: f32 = 10.0;
pub const SIZE_CODE: f32 = 9.0;
pub const SIZE_TIMESTAMP: f32 = 8.0;
pub const SIZE_FOOTER: f32 = 8.0;

pub const COLOR_TEXT: Rgb = [0, 0, 0];
pub const COLOR_HUMAN: Rgb = [0, 102, 204];
pub const COLOR_ASSISTANT: Rgb = [102, 102, 102];
pub const COLOR_TIMESTAMP: Rgb = [150, 150, 150];
pub const COLOR_FOOTER: Rgb = [150, 150, 150];
pub const COLOR_BORDER: Rgb = [200, 200, 200];
pub const COLOR_SECTION_BG: Rgb = [250, 250, 250];
pub const COLOR_LINK: Rgb = [0, 102, 204];
pub const COLOR_INLINE_CODE: Rgb = [220, 50, 50];
pub const COLOR_INLINE_CODE_BG: Rgb = [245, 245, 245];

// Substitutes used when the family lacks an emphasis face.
const COLOR_FALLBACK_BOLD: Rgb = [20, 20, 150];
const COLOR_FALLBACK_ITALIC: Rgb = [70, 130, 180];
const COLOR_FALLBACK_BOLD_ITALIC: Rgb = [30, 60, 120];

/// Width per character per point of font size when measurement fails.
const MEASURE_FALLBACK: f32 = 0.5;

/// Vertical advance of a line whose tallest run has `size`.
pub fn line_advance(size: f32) -> f32 {
    LINE_HEIGHT.max(size * 1.15)
}

pub fn geometry_for(width: f32, height: f32) -> PageGeometry {
    PageGeometry {
        width,
        height,
        margin_left: MARGIN_LEFT,
        margin_right: MARGIN_RIGHT,
        margin_top: MARGIN_TOP,
        margin_bottom: MARGIN_BOTTOM,
    }
}

/// Everything a renderer needs: the surface and the cursor over it. Styles
/// are passed explicitly with each call.
pub struct Layout<'a> {
    pub surface: &'a mut dyn Surface,
    pub cursor: Cursor,
}

impl<'a> Layout<'a> {
    pub fn new(surface: &'a mut dyn Surface) -> Self {
        let (width, height) = surface.page_size();
        let mut cursor = Cursor::new(geometry_for(width, height));
        cursor.page = surface.current_page();
        Layout { surface, cursor }
    }

    pub fn geometry(&self) -> PageGeometry {
        self.cursor.geometry
    }

    pub fn ensure_space(&mut self, required: f32) -> Result<bool, Error> {
        self.cursor.ensure_space(&mut *self.surface, required)
    }

    pub fn new_page(&mut self) -> Result<(), Error> {
        self.cursor.new_page(&mut *self.surface)
    }

    /// Text width, approximated from the character count when the surface
    /// cannot measure it.
    pub fn measure(&mut self, text: &str, style: &TextStyle) -> f32 {
        match self.surface.measure_text(text, style) {
            Ok(w) => w,
            Err(e) => {
                log::warn!("Measuring {:?} failed ({e}), approximating", truncate(text, 20));
                text.chars().count() as f32 * style.size * MEASURE_FALLBACK
            }
        }
    }

    /// Wrap `text` to `max_width`, falling back to plain newline splitting.
    pub fn split(&mut self, text: &str, max_width: f32, style: &TextStyle) -> Vec<String> {
        match self.surface.split_to_width(text, max_width, style) {
            Ok(lines) => lines,
            Err(e) => {
                log::warn!("Wrapping {:?} failed ({e}), splitting on newlines", truncate(text, 20));
                text.split('\n').map(str::to_string).collect()
            }
        }
    }

    /// Plain style in the best available face for `requested`.
    pub fn style(&self, requested: FontVariant, size: f32, color: Rgb) -> TextStyle {
        let (actual, _) = resolve_style(requested, self.surface.font_variants());
        TextStyle::new(actual, size, color)
    }

    /// Style for emphasised text. When the family lacks the requested face the
    /// emphasis is carried by colour and size instead.
    pub fn emphasis(&self, requested: FontVariant, size: f32, color: Rgb) -> TextStyle {
        let available = self.surface.font_variants();
        let (actual, fallback) = resolve_style(requested, available);
        if !fallback {
            return TextStyle::new(actual, size, color);
        }
        log::debug!("No {requested:?} face, substituting {actual:?}");
        match requested {
            FontVariant::Bold => TextStyle::new(actual, size + 1.0, COLOR_FALLBACK_BOLD),
            FontVariant::Italic if actual == FontVariant::Light => {
                TextStyle::new(actual, size, color)
            }
            FontVariant::Italic => TextStyle::new(actual, size, COLOR_FALLBACK_ITALIC),
            FontVariant::BoldItalic if actual == FontVariant::Bold => {
                TextStyle::new(actual, size, COLOR_FALLBACK_ITALIC)
            }
            FontVariant::BoldItalic => {
                TextStyle::new(actual, size + 0.5, COLOR_FALLBACK_BOLD_ITALIC)
            }
            _ => TextStyle::new(actual, size, color),
        }
    }

    /// Temporarily focus `page`. Focus returns to the last page of the
    /// document when the guard drops.
    pub fn focus(&mut self, page: usize) -> PageFocus<'_, 'a> {
        self.surface.set_page(page);
        PageFocus {
            surface: &mut *self.surface,
        }
    }
}

/// Scoped page focus; see [`Layout::focus`].
pub struct PageFocus<'s, 'a> {
    surface: &'s mut (dyn Surface + 'a),
}

impl PageFocus<'_, '_> {
    /// Move the focus to another page within the same scope.
    pub fn switch(&mut self, page: usize) {
        self.surface.set_page(page);
    }
}

impl<'a> Deref for PageFocus<'_, 'a> {
    type Target = dyn Surface + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.surface
    }
}

impl DerefMut for PageFocus<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.surface
    }
}

impl Drop for PageFocus<'_, '_> {
    fn drop(&mut self) {
        let last = self.surface.page_count();
        self.surface.set_page(last);
    }
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
