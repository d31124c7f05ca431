//! Write position and the page-break policy.

use crate::error::Error;
use crate::surface::Surface;

/// Page box and margins, in points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
}

impl PageGeometry {
    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    /// Lowest y content may reach.
    pub fn bottom_limit(&self) -> f32 {
        self.height - self.margin_bottom
    }

    pub fn right_edge(&self) -> f32 {
        self.width - self.margin_right
    }
}

/// Current page and vertical write position (distance from the page top).
#[derive(Clone, Debug)]
pub struct Cursor {
    pub page: usize,
    pub y: f32,
    pub geometry: PageGeometry,
    breaks: usize,
}

impl Cursor {
    pub fn new(geometry: PageGeometry) -> Self {
        Cursor {
            page: 1,
            y: geometry.margin_top,
            geometry,
            breaks: 0,
        }
    }

    pub fn advance(&mut self, dy: f32) {
        self.y += dy;
    }

    /// Spacing after a block. Stops at the bottom limit; the next
    /// `ensure_space` then breaks the page.
    pub fn space_after(&mut self, dy: f32) {
        self.y = (self.y + dy).min(self.geometry.bottom_limit());
    }

    /// Whether `height` more points fit below the current position.
    pub fn fits(&self, height: f32) -> bool {
        self.y + height <= self.geometry.bottom_limit()
    }

    /// Number of page breaks taken so far.
    pub fn breaks(&self) -> usize {
        self.breaks
    }

    /// Append a page to the surface and move to its top. Focus is always moved
    /// to the last page first so the new page lands at the end.
    pub fn new_page(&mut self, surface: &mut dyn Surface) -> Result<(), Error> {
        let last = surface.page_count();
        surface.set_page(last);
        surface.add_page()?;
        self.page = surface.current_page();
        self.y = self.geometry.margin_top;
        self.breaks += 1;
        log::debug!("Page break -> page {}", self.page);
        Ok(())
    }

    /// The only page-break decision point: start a new page when `required`
    /// points no longer fit. Returns whether a break happened. A fresh page is
    /// never abandoned, even for content taller than the page.
    pub fn ensure_space(&mut self, surface: &mut dyn Surface, required: f32) -> Result<bool, Error> {
        if self.fits(required) || self.y <= self.geometry.margin_top {
            return Ok(false);
        }
        self.new_page(surface)?;
        Ok(true)
    }
}

/// Which edges of a multi-page block a given page carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeRole {
    /// Block starts and ends here: fully closed.
    Only,
    /// Top edge, no bottom edge.
    First,
    /// Neither top nor bottom edge.
    Middle,
    /// Bottom edge, no top edge.
    Last,
}

impl EdgeRole {
    pub fn has_top(self) -> bool {
        matches!(self, EdgeRole::Only | EdgeRole::First)
    }

    pub fn has_bottom(self) -> bool {
        matches!(self, EdgeRole::Only | EdgeRole::Last)
    }
}

/// Extent of a block across pages, captured as it is rendered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockSpan {
    pub start_page: usize,
    pub start_y: f32,
    pub end_page: usize,
    pub end_y: f32,
}

/// Vertical range of a block on one page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpanSlice {
    pub page: usize,
    pub role: EdgeRole,
    pub top: f32,
    pub bottom: f32,
}

impl BlockSpan {
    pub fn open(cursor: &Cursor, start_y: f32) -> Self {
        BlockSpan {
            start_page: cursor.page,
            start_y,
            end_page: cursor.page,
            end_y: start_y,
        }
    }

    pub fn close(&mut self, cursor: &Cursor, end_y: f32) {
        self.end_page = cursor.page;
        self.end_y = end_y;
    }

    pub fn role(&self, page: usize) -> EdgeRole {
        match (page == self.start_page, page == self.end_page) {
            (true, true) => EdgeRole::Only,
            (true, false) => EdgeRole::First,
            (false, true) => EdgeRole::Last,
            (false, false) => EdgeRole::Middle,
        }
    }

    /// One slice per page the block touched. Pages other than the first start
    /// at `top`, pages other than the last run to `bottom`.
    pub fn slices(&self, top: f32, bottom: f32) -> Vec<SpanSlice> {
        (self.start_page..=self.end_page)
            .map(|page| {
                let role = self.role(page);
                SpanSlice {
                    page,
                    role,
                    top: if role.has_top() { self.start_y } else { top },
                    bottom: if role.has_bottom() { self.end_y } else { bottom },
                }
            })
            .collect()
    }
}
