use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use memmap2::Mmap;
use ttf_parser::Face;

use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FontVariant {
    Regular,
    Bold,
    Light,
    Italic,
    BoldItalic,
    /// Monospace face for inline code; always the built-in Courier.
    Mono,
}

impl FontVariant {
    /// Variants of the built-in base-14 Helvetica family.
    pub const BUILTIN: [FontVariant; 4] = [
        FontVariant::Regular,
        FontVariant::Bold,
        FontVariant::Italic,
        FontVariant::BoldItalic,
    ];

    fn suffix(self) -> &'static str {
        match self {
            FontVariant::Regular => "Regular",
            FontVariant::Bold => "Bold",
            FontVariant::Light => "Light",
            FontVariant::Italic => "Italic",
            FontVariant::BoldItalic => "BoldItalic",
            FontVariant::Mono => "Mono",
        }
    }
}

/// Pick the variant to actually use for `requested` given what the font
/// family provides. Returns the chosen variant and whether it is a fallback.
///
/// bold → regular; italic → light → regular; bold-italic → bold → light →
/// regular; light → regular. When nothing in the chain exists the first
/// available variant is used.
pub fn resolve_style(requested: FontVariant, available: &[FontVariant]) -> (FontVariant, bool) {
    if requested == FontVariant::Mono || available.contains(&requested) {
        return (requested, false);
    }
    let chain: &[FontVariant] = match requested {
        FontVariant::Bold => &[FontVariant::Regular],
        FontVariant::Italic => &[FontVariant::Light, FontVariant::Regular],
        FontVariant::BoldItalic => &[FontVariant::Bold, FontVariant::Light, FontVariant::Regular],
        FontVariant::Light => &[FontVariant::Regular],
        FontVariant::Regular | FontVariant::Mono => &[],
    };
    let actual = chain
        .iter()
        .find(|v| available.contains(v))
        .or(available.first())
        .copied()
        .unwrap_or(FontVariant::Regular);
    (actual, true)
}

#[derive(Clone, Debug, PartialEq)]
pub enum FontSource {
    /// Base-14 Helvetica, no embedding.
    Builtin,
    /// Directory holding `<Family>-Regular`, `-Bold` and `-Light` font files.
    Directory(PathBuf),
    /// Family name looked up in the system font directories.
    Family(String),
}

#[derive(Clone, Debug)]
pub struct FontOptions {
    pub source: FontSource,
    pub timeout: Duration,
}

impl Default for FontOptions {
    fn default() -> Self {
        FontOptions {
            source: FontSource::Builtin,
            timeout: Duration::from_secs(5),
        }
    }
}

pub struct LoadedFont {
    pub variant: FontVariant,
    pub data: Vec<u8>,
    pub face_index: u32,
}

/// Result of the font loading step. An empty face list means the built-in
/// family is used.
pub struct FontSet {
    pub family: String,
    pub faces: Vec<LoadedFont>,
}

impl FontSet {
    pub fn builtin() -> Self {
        FontSet {
            family: "Helvetica".to_string(),
            faces: Vec::new(),
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn variants(&self) -> Vec<FontVariant> {
        if self.is_builtin() {
            FontVariant::BUILTIN.to_vec()
        } else {
            self.faces.iter().map(|f| f.variant).collect()
        }
    }
}

/// Load the configured font family. Never fails: any error, an empty result
/// or hitting the timeout falls back to the built-in family.
pub async fn load_fonts(options: &FontOptions) -> FontSet {
    let t0 = Instant::now();
    let set = match tokio::time::timeout(options.timeout, load_source(&options.source)).await {
        Ok(Ok(set)) if !set.faces.is_empty() || options.source == FontSource::Builtin => set,
        Ok(Ok(set)) => {
            log::warn!("No usable variants for font family {} — using Helvetica", set.family);
            FontSet::builtin()
        }
        Ok(Err(e)) => {
            log::warn!("Font loading failed: {e} — using Helvetica");
            FontSet::builtin()
        }
        Err(_) => {
            log::warn!(
                "Font loading timed out after {:.1}s — using Helvetica",
                options.timeout.as_secs_f64()
            );
            FontSet::builtin()
        }
    };
    log::info!(
        "Font load: {:.1}ms, family={}, variants={:?}",
        t0.elapsed().as_secs_f64() * 1000.0,
        set.family,
        set.variants(),
    );
    set
}

async fn load_source(source: &FontSource) -> Result<FontSet, Error> {
    match source {
        FontSource::Builtin => Ok(FontSet::builtin()),
        FontSource::Directory(dir) => load_directory(dir).await,
        FontSource::Family(name) => {
            let name = name.clone();
            let found = tokio::task::spawn_blocking(move || find_family_files(&name))
                .await
                .map_err(|e| Error::Font(format!("font scan task failed: {e}")))?;
            let mut faces = Vec::new();
            for (variant, path, face_index) in found {
                if let Some(face) = read_variant(&path, variant, face_index).await {
                    faces.push(face);
                }
            }
            Ok(FontSet {
                family: source_family_name(source),
                faces,
            })
        }
    }
}

fn source_family_name(source: &FontSource) -> String {
    match source {
        FontSource::Builtin => "Helvetica".to_string(),
        FontSource::Directory(dir) => dir.display().to_string(),
        FontSource::Family(name) => name.clone(),
    }
}

/// Variant encoded in a file stem such as `NotoSansSC-Bold`.
fn variant_from_stem(stem: &str) -> Option<(String, FontVariant)> {
    let (family, style) = stem.rsplit_once('-')?;
    let variant = match style.to_ascii_lowercase().as_str() {
        "regular" => FontVariant::Regular,
        "bold" => FontVariant::Bold,
        "light" => FontVariant::Light,
        _ => return None,
    };
    Some((family.to_string(), variant))
}

async fn load_directory(dir: &Path) -> Result<FontSet, Error> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut candidates: Vec<(String, FontVariant, PathBuf)> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !is_font_file(&path) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if let Some((family, variant)) = variant_from_stem(stem) {
            candidates.push((family, variant, path));
        }
    }
    candidates.sort_by(|a, b| a.2.cmp(&b.2));

    // The family is whichever one provides a regular face first.
    let family = candidates
        .iter()
        .find(|(_, v, _)| *v == FontVariant::Regular)
        .or(candidates.first())
        .map(|(f, _, _)| f.clone())
        .ok_or_else(|| Error::Font(format!("no font files in {}", dir.display())))?;

    let mut faces: Vec<LoadedFont> = Vec::new();
    for (fam, variant, path) in &candidates {
        if *fam != family || faces.iter().any(|f| f.variant == *variant) {
            continue;
        }
        if let Some(face) = read_variant(path, *variant, 0).await {
            faces.push(face);
        }
    }
    Ok(FontSet { family, faces })
}

async fn read_variant(path: &Path, variant: FontVariant, face_index: u32) -> Option<LoadedFont> {
    let data = match tokio::fs::read(path).await {
        Ok(d) => d,
        Err(e) => {
            log::warn!("Skipping font {}: {e}", path.display());
            return None;
        }
    };
    if let Err(e) = validate_font(&data, face_index) {
        log::warn!("Skipping font {}: {e}", path.display());
        return None;
    }
    log::debug!(
        "Loaded font {} as {} ({:.2} MB)",
        path.display(),
        variant.suffix(),
        data.len() as f64 / (1024.0 * 1024.0),
    );
    Some(LoadedFont {
        variant,
        data,
        face_index,
    })
}

/// Check that the bytes are a TrueType font (or collection) that parses and
/// maps Unicode characters.
pub fn validate_font(data: &[u8], face_index: u32) -> Result<(), Error> {
    let magic = data
        .get(..4)
        .ok_or_else(|| Error::Font("file too short".into()))?;
    if !matches!(magic, [0x00, 0x01, 0x00, 0x00] | b"true" | b"ttcf") {
        return Err(Error::Font(format!(
            "not a TrueType font (magic {:02x}{:02x}{:02x}{:02x})",
            magic[0], magic[1], magic[2], magic[3]
        )));
    }
    let face = Face::parse(data, face_index).map_err(|e| Error::Font(e.to_string()))?;
    let has_unicode_cmap = face
        .tables()
        .cmap
        .is_some_and(|cmap| cmap.subtables.into_iter().any(|s| s.is_unicode()));
    if !has_unicode_cmap {
        return Err(Error::Font("no Unicode cmap table".into()));
    }
    Ok(())
}

fn font_family_name(face: &Face) -> Option<String> {
    for name in face.names() {
        if name.name_id == ttf_parser::name_id::FAMILY
            && name.is_unicode()
            && let Some(s) = name.to_string()
        {
            return Some(s);
        }
    }
    None
}

fn face_variant(face: &Face) -> FontVariant {
    match (face.is_bold(), face.is_italic()) {
        (true, true) => FontVariant::BoldItalic,
        (true, false) => FontVariant::Bold,
        (false, true) => FontVariant::Italic,
        (false, false) if face.weight().to_number() <= 300 => FontVariant::Light,
        (false, false) => FontVariant::Regular,
    }
}

fn font_directories() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    if let Ok(val) = std::env::var("TRANSCRIPT_PDF_FONTS") {
        let sep = if cfg!(windows) { ';' } else { ':' };
        for part in val.split(sep) {
            let trimmed = part.trim();
            if !trimmed.is_empty() {
                dirs.push(PathBuf::from(trimmed));
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        dirs.extend([
            "/Library/Fonts".into(),
            "/System/Library/Fonts".into(),
            "/System/Library/Fonts/Supplemental".into(),
        ]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join("Library/Fonts"));
        }
    }

    #[cfg(target_os = "linux")]
    {
        dirs.extend(["/usr/share/fonts".into(), "/usr/local/share/fonts".into()]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join(".local/share/fonts"));
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(windir) = std::env::var("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        } else {
            dirs.push("C:\\Windows\\Fonts".into());
        }
    }

    dirs
}

fn is_font_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("ttf" | "ttc")
    )
}

/// Walk the font directories and return every face of `family`, first match
/// per variant wins.
fn find_family_files(family: &str) -> Vec<(FontVariant, PathBuf, u32)> {
    let t0 = Instant::now();
    let wanted = family.to_lowercase();
    let mut found: HashMap<FontVariant, (PathBuf, u32)> = HashMap::new();
    let mut files_parsed = 0u32;
    let mut visited = std::collections::HashSet::new();

    let mut stack = font_directories();
    while let Some(dir) = stack.pop() {
        if !visited.insert(dir.clone()) {
            continue;
        }
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if !is_font_file(&path) {
                continue;
            }
            let Ok(file) = std::fs::File::open(&path) else {
                continue;
            };
            let Ok(data) = (unsafe { Mmap::map(&file) }) else {
                continue;
            };
            files_parsed += 1;
            let face_count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
            for face_index in 0..face_count {
                let Ok(face) = Face::parse(&data, face_index) else {
                    continue;
                };
                if font_family_name(&face).is_some_and(|f| f.to_lowercase() == wanted) {
                    found
                        .entry(face_variant(&face))
                        .or_insert((path.clone(), face_index));
                }
            }
        }
    }

    log::info!(
        "Font scan for {family:?}: {:.1}ms, {files_parsed} files parsed, {} variants found",
        t0.elapsed().as_secs_f64() * 1000.0,
        found.len(),
    );

    let mut out: Vec<(FontVariant, PathBuf, u32)> = found
        .into_iter()
        .map(|(variant, (path, index))| (variant, path, index))
        .collect();
    out.sort_by_key(|(v, _, _)| *v as u8);
    out
}

/// Map a single Unicode char to its WinAnsi byte, or 0 if unmappable.
pub(crate) fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007E => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// Convert a UTF-8 string to WinAnsi (Windows-1252) bytes, dropping anything
/// the encoding cannot represent.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars().map(char_to_winansi).filter(|&b| b != 0).collect()
}

/// Approximate base-14 advance width (1000 units/em) for a WinAnsi byte.
pub(crate) fn builtin_width_1000(variant: FontVariant, byte: u8) -> f32 {
    if variant == FontVariant::Mono {
        return 600.0;
    }
    let regular = match byte {
        32 => 278.0,
        33..=47 => 333.0,
        48..=57 => 556.0,
        58..=64 => 333.0,
        73 | 74 => 278.0,
        77 => 833.0,
        65..=90 => 667.0,
        91..=96 => 333.0,
        102 | 105 | 106 | 108 | 116 => 278.0,
        109 | 119 => 833.0,
        97..=122 => 556.0,
        _ => 556.0,
    };
    match variant {
        FontVariant::Bold | FontVariant::BoldItalic => regular * 1.06,
        _ => regular,
    }
}
