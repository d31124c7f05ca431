mod error;
pub mod fonts;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod sanitize;
pub mod surface;

pub use error::Error;
pub use fonts::{FontOptions, FontSource};
pub use layout::document::{ExportReport, MessageAnchor};
pub use model::{ExportConfig, Message, Meta, PageFormat, Sender, Transcript};

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;

use layout::document::Assembler;
use pdf::PdfSurface;
use surface::{Recorder, Surface};

/// Format of the export stamp shown in the metadata block and footers.
pub const EXPORT_STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Lay `transcript` out onto `surface`. `exported_at` is the stamp printed in
/// the metadata block and every footer.
pub fn render_transcript(
    surface: &mut dyn Surface,
    transcript: &Transcript,
    config: &ExportConfig,
    exported_at: &str,
) -> Result<ExportReport, Error> {
    if transcript.messages.is_empty() {
        return Err(Error::InvalidInput("transcript has no messages".into()));
    }
    Assembler::new(surface, config, exported_at).run(transcript)
}

/// Run the layout against an in-memory surface without producing a PDF.
pub fn dry_run(transcript: &Transcript, config: &ExportConfig) -> Result<ExportReport, Error> {
    let (width, height) = config.page_format.dimensions();
    let mut surface = Recorder::new(width, height).with_page_limit(config.page_limit);
    let stamp = chrono::Local::now().format(EXPORT_STAMP_FORMAT).to_string();
    render_transcript(&mut surface, transcript, config, &stamp)
}

/// Export `transcript` as a PDF into `out_dir` and return the written path.
///
/// Font loading is the only awaited step. Nothing is written unless layout
/// and PDF assembly both succeed.
pub async fn export_to_pdf(
    transcript: &Transcript,
    config: &ExportConfig,
    fonts: &FontOptions,
    out_dir: &Path,
) -> Result<PathBuf, Error> {
    let t0 = Instant::now();

    let font_set = fonts::load_fonts(fonts).await;
    let t_fonts = t0.elapsed();

    let now = chrono::Local::now();
    let stamp = now.format(EXPORT_STAMP_FORMAT).to_string();
    let (width, height) = config.page_format.dimensions();
    let mut surface = PdfSurface::new(width, height, font_set, config.page_limit);
    surface.set_title(transcript.meta.name.as_deref().unwrap_or("Conversation"));

    let report = render_transcript(&mut surface, transcript, config, &stamp)?;
    let t_layout = t0.elapsed();

    let bytes = surface.finish()?;
    let t_finish = t0.elapsed();

    let path = out_dir.join(export_filename(&transcript.meta, now.date_naive()));
    tokio::fs::write(&path, &bytes).await.map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: fonts={:.1}ms, layout={:.1}ms, finish={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_fonts.as_secs_f64() * 1000.0,
        (t_layout - t_fonts).as_secs_f64() * 1000.0,
        (t_finish - t_layout).as_secs_f64() * 1000.0,
        (t_total - t_finish).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );
    log::info!(
        "Exported {} messages on {} pages to {}",
        report.anchors.len(),
        report.pages,
        path.display()
    );

    Ok(path)
}

/// Short name of the exporting platform used as the filename prefix.
pub fn platform_prefix(platform: Option<&str>) -> &'static str {
    let platform = platform.unwrap_or_default().to_lowercase();
    ["chatgpt", "gemini", "notebooklm", "aistudio", "sillytavern"]
        .into_iter()
        .find(|p| platform.contains(p))
        .unwrap_or("claude")
}

/// `{platform}_{title}_{YYYY-MM-DD}.pdf`. Title characters other than ASCII
/// letters, digits and CJK ideographs become `_`.
pub fn export_filename(meta: &Meta, date: NaiveDate) -> String {
    let title: String = meta
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or("conversation")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || ('\u{4e00}'..='\u{9fa5}').contains(&c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "{}_{}_{}.pdf",
        platform_prefix(meta.platform.as_deref()),
        title,
        date.format("%Y-%m-%d")
    )
}
