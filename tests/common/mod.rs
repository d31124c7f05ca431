#![allow(dead_code)]

use transcript_pdf::layout::cursor::PageGeometry;
use transcript_pdf::layout::geometry_for;
use transcript_pdf::surface::{Op, Pen, Recorder};
use transcript_pdf::{ExportConfig, ExportReport, Message, Meta, PageFormat, Sender, Transcript};

/// Export stamp used wherever a test renders a whole document.
pub const STAMP: &str = "2026-01-02 03:04:05";

pub fn a4() -> Recorder {
    let (w, h) = PageFormat::A4.dimensions();
    Recorder::new(w, h)
}

pub fn a4_geometry() -> PageGeometry {
    let (w, h) = PageFormat::A4.dimensions();
    geometry_for(w, h)
}

pub fn human(text: &str) -> Message {
    Message::new(Sender::Human, text)
}

pub fn assistant(text: &str) -> Message {
    Message::new(Sender::Assistant, text)
}

pub fn transcript(messages: Vec<Message>) -> Transcript {
    Transcript {
        meta: Meta {
            name: Some("Pagination test".into()),
            platform: Some("claude".into()),
            created_at: Some("2026-01-01".into()),
            updated_at: None,
        },
        messages,
    }
}

/// A fenced block of `lines` numbered Rust statements.
pub fn code_block(language: &str, lines: usize) -> String {
    let body: Vec<String> = (1..=lines)
        .map(|i| format!("let value_{i} = compute({i});"))
        .collect();
    format!("```{language}\n{}\n```", body.join("\n"))
}

pub fn all_enabled() -> ExportConfig {
    ExportConfig {
        include_timestamps: true,
        ..ExportConfig::default()
    }
}

pub fn render(recorder: &mut Recorder, transcript: &Transcript) -> ExportReport {
    transcript_pdf::render_transcript(recorder, transcript, &all_enabled(), STAMP)
        .expect("render transcript")
}

/// Lines drawn with `pen`'s colour and width.
pub fn lines_with<'a>(
    recorder: &'a Recorder,
    pen: Pen,
) -> impl Iterator<Item = (usize, (f32, f32), (f32, f32))> + 'a {
    recorder.ops.iter().filter_map(move |op| match op {
        Op::Line {
            page,
            from,
            to,
            pen: p,
        } if *p == pen => Some((*page, *from, *to)),
        _ => None,
    })
}

/// Footer page counters (`"i / N"`) in draw order.
pub fn page_counters(recorder: &Recorder) -> Vec<(usize, String)> {
    let geo = a4_geometry();
    recorder
        .texts()
        .filter(|(_, _, y, text, _)| *y > geo.bottom_limit() && text.contains(" / "))
        .map(|(page, _, _, text, _)| (page, text.to_string()))
        .collect()
}
