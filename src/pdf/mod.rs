mod embed;

use pdf_writer::types::{ActionType, AnnotationType};
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::error::Error;
use crate::fonts::{FontSet, FontVariant, builtin_width_1000, resolve_style, to_winansi_bytes};
use crate::surface::{Area, LinkTarget, OutlineNode, Pen, Rgb, Surface, TextStyle};

use embed::EmbeddedFace;

/// Bezier control distance for a quarter circle.
const KAPPA: f32 = 0.552_284_8;

enum FontSlot {
    Builtin(&'static str),
    Embedded(EmbeddedFace),
}

struct FontResource {
    variant: FontVariant,
    pdf_name: String,
    slot: FontSlot,
}

struct PendingLink {
    rect: Rect,
    target: LinkTarget,
}

struct PageBuf {
    content: Content,
    links: Vec<PendingLink>,
}

impl PageBuf {
    fn new() -> Self {
        PageBuf {
            content: Content::new(),
            links: Vec::new(),
        }
    }
}

/// [`Surface`] backed by `pdf-writer`. Every page keeps its own content
/// stream so earlier pages can be revisited; objects are only allocated and
/// written in [`PdfSurface::finish`].
pub struct PdfSurface {
    width: f32,
    height: f32,
    pages: Vec<PageBuf>,
    current: usize,
    fonts: Vec<FontResource>,
    variants: Vec<FontVariant>,
    outline: Vec<OutlineNode>,
    page_limit: usize,
    title: Option<String>,
}

fn builtin_base_font(variant: FontVariant) -> &'static str {
    match variant {
        FontVariant::Regular | FontVariant::Light => "Helvetica",
        FontVariant::Bold => "Helvetica-Bold",
        FontVariant::Italic => "Helvetica-Oblique",
        FontVariant::BoldItalic => "Helvetica-BoldOblique",
        FontVariant::Mono => "Courier",
    }
}

impl PdfSurface {
    /// A document with one empty page of `width`×`height` points.
    pub fn new(width: f32, height: f32, fonts: FontSet, page_limit: usize) -> Self {
        let mut resources: Vec<FontResource> = Vec::new();
        for face in fonts.faces {
            let ps_name = format!("{}-{:?}", fonts.family.replace(' ', ""), face.variant);
            match EmbeddedFace::new(ps_name, face.data, face.face_index) {
                Ok(embedded) => resources.push(FontResource {
                    variant: face.variant,
                    pdf_name: String::new(),
                    slot: FontSlot::Embedded(embedded),
                }),
                Err(e) => log::warn!("Dropping font variant {:?}: {e}", face.variant),
            }
        }
        if resources.is_empty() {
            for variant in FontVariant::BUILTIN {
                resources.push(FontResource {
                    variant,
                    pdf_name: String::new(),
                    slot: FontSlot::Builtin(builtin_base_font(variant)),
                });
            }
        }
        resources.push(FontResource {
            variant: FontVariant::Mono,
            pdf_name: String::new(),
            slot: FontSlot::Builtin(builtin_base_font(FontVariant::Mono)),
        });
        for (i, res) in resources.iter_mut().enumerate() {
            res.pdf_name = format!("F{}", i + 1);
        }
        let variants = resources
            .iter()
            .map(|r| r.variant)
            .filter(|v| *v != FontVariant::Mono)
            .collect();

        PdfSurface {
            width,
            height,
            pages: vec![PageBuf::new()],
            current: 0,
            fonts: resources,
            variants,
            outline: Vec::new(),
            page_limit,
            title: None,
        }
    }

    /// Document title written to the info dictionary.
    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    fn font_index(&self, variant: FontVariant) -> usize {
        let (actual, _) = resolve_style(variant, &self.variants);
        self.fonts
            .iter()
            .position(|f| f.variant == actual)
            .unwrap_or(0)
    }

    fn page(&mut self) -> &mut PageBuf {
        &mut self.pages[self.current]
    }

    /// Convert a top-down area to a PDF rectangle.
    fn pdf_rect(&self, area: Area) -> Rect {
        Rect::new(
            area.x,
            self.height - area.y - area.height,
            area.x + area.width,
            self.height - area.y,
        )
    }

    fn rounded_path(content: &mut Content, rect: Rect, radius: f32) {
        let r = radius
            .min((rect.x2 - rect.x1) / 2.0)
            .min((rect.y2 - rect.y1) / 2.0)
            .max(0.0);
        let k = r * KAPPA;
        let Rect { x1, y1, x2, y2 } = rect;
        content.move_to(x1 + r, y1);
        content.line_to(x2 - r, y1);
        content.cubic_to(x2 - r + k, y1, x2, y1 + r - k, x2, y1 + r);
        content.line_to(x2, y2 - r);
        content.cubic_to(x2, y2 - r + k, x2 - r + k, y2, x2 - r, y2);
        content.line_to(x1 + r, y2);
        content.cubic_to(x1 + r - k, y2, x1, y2 - r + k, x1, y2 - r);
        content.line_to(x1, y1 + r);
        content.cubic_to(x1, y1 + r - k, x1 + r - k, y1, x1 + r, y1);
        content.close_path();
    }

    /// Serialise the document. Fonts are subset to the glyphs drawn.
    pub fn finish(self) -> Result<Vec<u8>, Error> {
        let t0 = std::time::Instant::now();
        let mut pdf = Pdf::new();
        let mut next_id = 1i32;
        let mut alloc = || {
            let r = Ref::new(next_id);
            next_id += 1;
            r
        };

        let catalog_id = alloc();
        let pages_id = alloc();
        let info_id = alloc();

        let mut font_pairs: Vec<(String, Ref)> = Vec::new();
        for res in &self.fonts {
            let font_ref = alloc();
            match &res.slot {
                FontSlot::Builtin(base) => {
                    pdf.type1_font(font_ref)
                        .base_font(Name(base.as_bytes()))
                        .encoding_predefined(Name(b"WinAnsiEncoding"));
                }
                FontSlot::Embedded(face) => face.write(&mut pdf, font_ref, &mut alloc)?,
            }
            font_pairs.push((res.pdf_name.clone(), font_ref));
        }
        let t_fonts = t0.elapsed();

        let n = self.pages.len();
        let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
        let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

        let page_annot_refs: Vec<Vec<Ref>> = self
            .pages
            .iter()
            .map(|page| {
                page.links
                    .iter()
                    .map(|link| {
                        let annot_ref = alloc();
                        let mut annot = pdf.annotation(annot_ref);
                        annot
                            .subtype(AnnotationType::Link)
                            .rect(link.rect)
                            .border(0.0, 0.0, 0.0, None);
                        match &link.target {
                            LinkTarget::Uri(url) => {
                                annot
                                    .action()
                                    .action_type(ActionType::Uri)
                                    .uri(Str(url.as_bytes()));
                            }
                            LinkTarget::Page(p) => {
                                let dest = page_ids[(*p).clamp(1, n) - 1];
                                annot
                                    .action()
                                    .action_type(ActionType::GoTo)
                                    .destination()
                                    .page(dest)
                                    .xyz(0.0, self.height, None);
                            }
                        }
                        annot_ref
                    })
                    .collect()
            })
            .collect();

        let outline_id = if self.outline.is_empty() {
            None
        } else {
            let outline_id = alloc();
            write_outline(&mut pdf, &mut alloc, outline_id, &self.outline, &page_ids, self.height);
            Some(outline_id)
        };

        for (i, page) in self.pages.into_iter().enumerate() {
            let raw = page.content.finish();
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
            pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
        }

        {
            let mut catalog = pdf.catalog(catalog_id);
            catalog.pages(pages_id);
            if let Some(outline_id) = outline_id {
                catalog.outlines(outline_id);
                catalog.page_mode(pdf_writer::types::PageMode::UseOutlines);
            }
        }
        pdf.pages(pages_id)
            .kids(page_ids.iter().copied())
            .count(n as i32);

        for i in 0..n {
            let mut page = pdf.page(page_ids[i]);
            page.media_box(Rect::new(0.0, 0.0, self.width, self.height))
                .parent(pages_id)
                .contents(content_ids[i]);
            if !page_annot_refs[i].is_empty() {
                page.annotations(page_annot_refs[i].iter().copied());
            }
            let mut resources = page.resources();
            let mut fonts = resources.fonts();
            for (name, font_ref) in &font_pairs {
                fonts.pair(Name(name.as_bytes()), *font_ref);
            }
        }

        {
            let mut info = pdf.document_info(info_id);
            if let Some(title) = &self.title {
                info.title(TextStr(title));
            }
            info.creator(TextStr(env!("CARGO_PKG_NAME")));
            info.producer(TextStr(concat!("pdf-writer via ", env!("CARGO_PKG_NAME"))));
        }

        log::info!(
            "PDF assembly: fonts={:.1}ms, pages={:.1}ms ({n} pages)",
            t_fonts.as_secs_f64() * 1000.0,
            (t0.elapsed() - t_fonts).as_secs_f64() * 1000.0,
        );
        Ok(pdf.finish())
    }
}

/// Write the outline dictionary and one item per node. Items are allocated
/// up front so siblings can reference each other.
fn write_outline(
    pdf: &mut Pdf,
    alloc: &mut impl FnMut() -> Ref,
    outline_id: Ref,
    roots: &[OutlineNode],
    page_ids: &[Ref],
    page_height: f32,
) {
    let root_refs = write_outline_level(pdf, alloc, outline_id, roots, page_ids, page_height);
    let total = count_nodes(roots);
    let mut outline = pdf.outline(outline_id);
    if let (Some(first), Some(last)) = (root_refs.first(), root_refs.last()) {
        outline.first(*first).last(*last);
    }
    outline.count(total as i32);
}

fn count_nodes(nodes: &[OutlineNode]) -> usize {
    nodes.iter().map(|n| 1 + count_nodes(&n.children)).sum()
}

fn write_outline_level(
    pdf: &mut Pdf,
    alloc: &mut impl FnMut() -> Ref,
    parent: Ref,
    nodes: &[OutlineNode],
    page_ids: &[Ref],
    page_height: f32,
) -> Vec<Ref> {
    let refs: Vec<Ref> = nodes.iter().map(|_| alloc()).collect();
    for (i, node) in nodes.iter().enumerate() {
        let child_refs =
            write_outline_level(pdf, alloc, refs[i], &node.children, page_ids, page_height);
        let Some(&page_ref) = node.page.checked_sub(1).and_then(|p| page_ids.get(p)) else {
            continue;
        };
        let mut item = pdf.outline_item(refs[i]);
        item.title(TextStr(&node.title)).parent(parent);
        if i > 0 {
            item.prev(refs[i - 1]);
        }
        if let Some(next) = refs.get(i + 1) {
            item.next(*next);
        }
        if let (Some(first), Some(last)) = (child_refs.first(), child_refs.last()) {
            item.first(*first).last(*last);
            item.count(count_nodes(&node.children) as i32);
        }
        item.dest().page(page_ref).xyz(0.0, page_height - node.y, None);
    }
    refs
}

impl Surface for PdfSurface {
    fn page_size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn current_page(&self) -> usize {
        self.current + 1
    }

    fn add_page(&mut self) -> Result<(), Error> {
        if self.pages.len() >= self.page_limit {
            return Err(Error::Pdf(format!(
                "page limit of {} reached",
                self.page_limit
            )));
        }
        self.pages.push(PageBuf::new());
        self.current = self.pages.len() - 1;
        Ok(())
    }

    fn set_page(&mut self, page: usize) {
        if (1..=self.pages.len()).contains(&page) {
            self.current = page - 1;
        }
    }

    fn font_variants(&self) -> &[FontVariant] {
        &self.variants
    }

    fn measure_text(&mut self, text: &str, style: &TextStyle) -> Result<f32, Error> {
        let idx = self.font_index(style.variant);
        let res = &mut self.fonts[idx];
        let width_1000 = match &mut res.slot {
            FontSlot::Builtin(_) => to_winansi_bytes(text)
                .into_iter()
                .map(|b| builtin_width_1000(res.variant, b))
                .sum(),
            FontSlot::Embedded(face) => face.width_1000(text)?,
        };
        Ok(width_1000 * style.size / 1000.0)
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) {
        if text.is_empty() {
            return;
        }
        let idx = self.font_index(style.variant);
        let res = &mut self.fonts[idx];
        let bytes = match &mut res.slot {
            FontSlot::Builtin(_) => to_winansi_bytes(text),
            FontSlot::Embedded(face) => face.encode(text),
        };
        let pdf_name = res.pdf_name.clone();
        let baseline = self.height - y;
        let [r, g, b] = style.color;
        let content = &mut self.page().content;
        content.save_state();
        content.set_fill_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
        content.begin_text();
        content.set_font(Name(pdf_name.as_bytes()), style.size);
        content.next_line(x, baseline);
        content.show(Str(&bytes));
        content.end_text();
        content.restore_state();
    }

    fn fill_rect(&mut self, area: Area, color: Rgb) {
        let rect = self.pdf_rect(area);
        let [r, g, b] = color;
        let content = &mut self.page().content;
        content.save_state();
        content.set_fill_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
        content.rect(rect.x1, rect.y1, rect.x2 - rect.x1, rect.y2 - rect.y1);
        content.fill_nonzero();
        content.restore_state();
    }

    fn fill_rounded_rect(&mut self, area: Area, radius: f32, color: Rgb) {
        let rect = self.pdf_rect(area);
        let [r, g, b] = color;
        let content = &mut self.page().content;
        content.save_state();
        content.set_fill_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
        Self::rounded_path(content, rect, radius);
        content.fill_nonzero();
        content.restore_state();
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), pen: Pen) {
        let h = self.height;
        let [r, g, b] = pen.color;
        let content = &mut self.page().content;
        content.save_state();
        content.set_stroke_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
        content.set_line_width(pen.width);
        content.move_to(from.0, h - from.1);
        content.line_to(to.0, h - to.1);
        content.stroke();
        content.restore_state();
    }

    fn stroke_rounded_rect(&mut self, area: Area, radius: f32, pen: Pen) {
        let rect = self.pdf_rect(area);
        let [r, g, b] = pen.color;
        let content = &mut self.page().content;
        content.save_state();
        content.set_stroke_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
        content.set_line_width(pen.width);
        Self::rounded_path(content, rect, radius);
        content.stroke();
        content.restore_state();
    }

    fn add_link(&mut self, area: Area, target: LinkTarget) {
        let rect = self.pdf_rect(area);
        self.page().links.push(PendingLink { rect, target });
    }

    fn set_outline(&mut self, outline: Vec<OutlineNode>) -> bool {
        self.outline = outline;
        true
    }
}
