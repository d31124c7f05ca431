use std::collections::{BTreeMap, HashMap};

use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, UnicodeCmap};
use pdf_writer::{Name, Pdf, Rect, Ref, Str};
use ttf_parser::{Face, GlyphId};

use crate::error::Error;

/// A TrueType face drawn through a Type0/CIDFontType2 font with Identity-H
/// encoding. Glyph ids are remapped as text is drawn so the subset written by
/// [`EmbeddedFace::write`] only holds glyphs that appear in the document.
pub(super) struct EmbeddedFace {
    pub(super) ps_name: String,
    data: Vec<u8>,
    face_index: u32,
    /// char -> (original glyph id, advance in 1000 units/em)
    glyphs: HashMap<char, (u16, f32)>,
    remapper: subsetter::GlyphRemapper,
    /// char -> remapped glyph id, for widths and ToUnicode
    used: BTreeMap<char, u16>,
}

impl EmbeddedFace {
    pub(super) fn new(ps_name: String, data: Vec<u8>, face_index: u32) -> Result<Self, Error> {
        Face::parse(&data, face_index).map_err(|e| Error::Font(format!("{ps_name}: {e}")))?;
        Ok(EmbeddedFace {
            ps_name,
            data,
            face_index,
            glyphs: HashMap::new(),
            remapper: subsetter::GlyphRemapper::new(),
            used: BTreeMap::new(),
        })
    }

    /// Make sure every char of `text` has a cached glyph entry. The face is
    /// only parsed when something is missing.
    fn cache_glyphs(&mut self, text: &str) -> Result<(), Error> {
        if text.chars().all(|ch| self.glyphs.contains_key(&ch)) {
            return Ok(());
        }
        let face = Face::parse(&self.data, self.face_index)
            .map_err(|e| Error::Font(format!("{}: {e}", self.ps_name)))?;
        let units = face.units_per_em() as f32;
        for ch in text.chars() {
            if self.glyphs.contains_key(&ch) {
                continue;
            }
            let gid = face.glyph_index(ch).unwrap_or(GlyphId(0));
            let advance = face
                .glyph_hor_advance(gid)
                .map(|adv| adv as f32 / units * 1000.0)
                .unwrap_or(0.0);
            self.glyphs.insert(ch, (gid.0, advance));
        }
        Ok(())
    }

    pub(super) fn width_1000(&mut self, text: &str) -> Result<f32, Error> {
        self.cache_glyphs(text)?;
        Ok(text
            .chars()
            .filter_map(|ch| self.glyphs.get(&ch))
            .map(|&(_, w)| w)
            .sum())
    }

    /// Encode text as big-endian 2-byte remapped glyph ids.
    pub(super) fn encode(&mut self, text: &str) -> Vec<u8> {
        if let Err(e) = self.cache_glyphs(text) {
            log::warn!("{e}");
        }
        let mut out = Vec::with_capacity(text.len() * 2);
        for ch in text.chars() {
            let gid = self.glyphs.get(&ch).map_or(0, |&(gid, _)| gid);
            let new_gid = self.remapper.remap(gid);
            if gid != 0 {
                self.used.insert(ch, new_gid);
            }
            out.push((new_gid >> 8) as u8);
            out.push((new_gid & 0xFF) as u8);
        }
        out
    }

    /// Write the subset font program, descriptor, CID font, ToUnicode CMap and
    /// the Type0 font dictionary at `font_ref`.
    pub(super) fn write(
        &self,
        pdf: &mut Pdf,
        font_ref: Ref,
        alloc: &mut impl FnMut() -> Ref,
    ) -> Result<(), Error> {
        let face = Face::parse(&self.data, self.face_index)
            .map_err(|e| Error::Font(format!("{}: {e}", self.ps_name)))?;
        let units = face.units_per_em() as f32;
        let scale = |v: f32| v / units * 1000.0;

        let descriptor_ref = alloc();
        let data_ref = alloc();
        let cid_font_ref = alloc();
        let tounicode_ref = alloc();

        let subset_data = subsetter::subset(&self.data, self.face_index, &self.remapper)
            .unwrap_or_else(|e| {
                log::warn!("Font subsetting failed for {}: {e} — embedding full font", self.ps_name);
                self.data.clone()
            });
        let data_len = i32::try_from(subset_data.len())
            .map_err(|_| Error::Pdf(format!("font program for {} too large", self.ps_name)))?;
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&subset_data, 6);
        pdf.stream(data_ref, &compressed)
            .filter(pdf_writer::Filter::FlateDecode)
            .pair(Name(b"Length1"), data_len);

        let bb = face.global_bounding_box();
        pdf.font_descriptor(descriptor_ref)
            .name(Name(self.ps_name.as_bytes()))
            .flags(FontFlags::NON_SYMBOLIC)
            .bbox(Rect::new(
                scale(bb.x_min as f32),
                scale(bb.y_min as f32),
                scale(bb.x_max as f32),
                scale(bb.y_max as f32),
            ))
            .italic_angle(0.0)
            .ascent(scale(face.ascender() as f32))
            .descent(scale(face.descender() as f32))
            .cap_height(face.capital_height().map_or(700.0, |h| scale(h as f32)))
            .stem_v(80.0)
            .font_file2(data_ref);

        let system_info = SystemInfo {
            registry: Str(b"Adobe"),
            ordering: Str(b"Identity"),
            supplement: 0,
        };
        {
            let mut cid = pdf.cid_font(cid_font_ref);
            cid.subtype(CidFontType::Type2);
            cid.base_font(Name(self.ps_name.as_bytes()));
            cid.system_info(system_info);
            cid.font_descriptor(descriptor_ref);
            cid.default_width(0.0);
            cid.cid_to_gid_map_predefined(Name(b"Identity"));
            let mut gid_widths: Vec<(u16, f32)> = self
                .used
                .iter()
                .filter_map(|(ch, &new_gid)| self.glyphs.get(ch).map(|&(_, w)| (new_gid, w)))
                .collect();
            gid_widths.sort_by_key(|&(gid, _)| gid);
            gid_widths.dedup_by_key(|&mut (gid, _)| gid);
            if !gid_widths.is_empty() {
                let mut w = cid.widths();
                for &(gid, width) in &gid_widths {
                    w.consecutive(gid, [width]);
                }
            }
        }

        let cmap_name = format!("{}-UTF16", self.ps_name);
        let mut cmap = UnicodeCmap::new(
            Name(cmap_name.as_bytes()),
            SystemInfo {
                registry: Str(b"Adobe"),
                ordering: Str(b"Identity"),
                supplement: 0,
            },
        );
        for (&ch, &new_gid) in &self.used {
            cmap.pair(new_gid, ch);
        }
        pdf.stream(tounicode_ref, cmap.finish().as_slice());

        pdf.type0_font(font_ref)
            .base_font(Name(self.ps_name.as_bytes()))
            .encoding_predefined(Name(b"Identity-H"))
            .descendant_font(cid_font_ref)
            .to_unicode(tounicode_ref);

        log::debug!(
            "Embedded {}: {} glyphs, {} bytes after subsetting",
            self.ps_name,
            self.used.len(),
            subset_data.len(),
        );
        Ok(())
    }
}
