//! Document assembly. Messages are laid out in one pass that records an
//! anchor per message; the table of contents, outline and footers are built
//! from those anchors once the page count is known.

use crate::error::Error;
use crate::fonts::FontVariant;
use crate::model::{BranchInfo, ExportConfig, Message, Meta, Sender, ToolCall, Transcript};
use crate::sanitize::clean_text;
use crate::surface::{Area, LinkTarget, OutlineNode, Pen, Rgb, Surface, TextStyle};

use super::blocks::{render_markdown, render_section};
use super::code::render_code_block;
use super::markup::{BodyPart, split_fenced};
use super::{
    COLOR_ASSISTANT, COLOR_BORDER, COLOR_FOOTER, COLOR_HUMAN, COLOR_TEXT, COLOR_TIMESTAMP,
    FOOTER_BASELINE, FOOTER_HEIGHT, LINE_HEIGHT, Layout, MESSAGE_SPACING, SECTION_SPACING,
    SIZE_BODY, SIZE_FOOTER, SIZE_H1, SIZE_SENDER, SIZE_TIMESTAMP, SIZE_TITLE, line_advance, mm,
    truncate,
};

/// Characters of message text kept for the TOC preview.
pub const PREVIEW_CHARS: usize = 50;

/// Room reserved for one TOC entry with its preview line.
const TOC_ENTRY_ROOM: f32 = mm(20.0);

/// Where a message starts. Recorded once when its rendering begins.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageAnchor {
    /// 1-based message number.
    pub index: usize,
    pub page: usize,
    pub y: f32,
    pub sender: Sender,
    pub preview: String,
    pub branch: Option<BranchInfo>,
}

impl MessageAnchor {
    /// `"{n}. Human"` / `"{n}. Assistant"`.
    pub fn title(&self) -> String {
        format!("{}. {}", self.index, self.sender.label())
    }
}

/// What an export produced, for logging and the dry-run report.
#[derive(Clone, Debug, Default)]
pub struct ExportReport {
    pub pages: usize,
    pub page_breaks: usize,
    pub anchors: Vec<MessageAnchor>,
    pub toc_page: Option<usize>,
    pub toc_entries: usize,
    pub outline_installed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Init,
    RenderTitle,
    RenderMetadata,
    RenderMessages,
    RenderToc,
    BuildOutline,
    RenderFooters,
    Finalize,
}

pub struct Assembler<'a, 'c> {
    layout: Layout<'a>,
    config: &'c ExportConfig,
    exported_at: &'c str,
    anchors: Vec<MessageAnchor>,
    phase: Phase,
}

impl<'a, 'c> Assembler<'a, 'c> {
    pub fn new(surface: &'a mut dyn Surface, config: &'c ExportConfig, exported_at: &'c str) -> Self {
        Assembler {
            layout: Layout::new(surface),
            config,
            exported_at,
            anchors: Vec::new(),
            phase: Phase::Init,
        }
    }

    fn enter(&mut self, phase: Phase) {
        log::debug!(
            "Assembler: {:?} -> {:?} (page {}, {} anchors)",
            self.phase,
            phase,
            self.layout.cursor.page,
            self.anchors.len()
        );
        self.phase = phase;
    }

    pub fn run(mut self, transcript: &Transcript) -> Result<ExportReport, Error> {
        self.enter(Phase::RenderTitle);
        self.render_title(&transcript.meta)?;

        self.enter(Phase::RenderMetadata);
        self.render_metadata(&transcript.meta)?;

        self.enter(Phase::RenderMessages);
        for (i, message) in transcript.messages.iter().enumerate() {
            if i > 0 && message.sender == Sender::Human {
                self.layout.new_page()?;
            }
            self.render_message(message, i + 1)?;
        }

        let mut report = ExportReport::default();
        if transcript.messages.len() > 1 {
            self.enter(Phase::RenderToc);
            let (page, entries) = self.render_toc()?;
            report.toc_page = Some(page);
            report.toc_entries = entries;
        }

        self.enter(Phase::BuildOutline);
        let outline = build_outline(&self.anchors);
        if !outline.is_empty() {
            report.outline_installed = self.layout.surface.set_outline(outline);
            if !report.outline_installed {
                log::info!("Surface has no outline support, bookmarks skipped");
            }
        }

        self.enter(Phase::RenderFooters);
        self.render_footers();

        self.enter(Phase::Finalize);
        report.pages = self.layout.surface.page_count();
        report.page_breaks = self.layout.cursor.breaks();
        report.anchors = self.anchors;
        Ok(report)
    }

    fn text_style(&self, size: f32, color: Rgb) -> TextStyle {
        self.layout.style(FontVariant::Regular, size, color)
    }

    fn render_title(&mut self, meta: &Meta) -> Result<(), Error> {
        let title = meta
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Conversation");
        let title = clean_text(title);
        let style = self.layout.style(FontVariant::Bold, SIZE_TITLE, COLOR_TEXT);
        let width = self.layout.geometry().content_width();
        let left = self.layout.geometry().margin_left;

        for line in self.layout.split(&title, width, &style) {
            self.layout.ensure_space(line_advance(SIZE_TITLE))?;
            if !line.trim().is_empty() {
                self.layout
                    .surface
                    .draw_text(&line, left, self.layout.cursor.y, &style);
            }
            self.layout.cursor.advance(LINE_HEIGHT * 1.5);
        }
        self.layout.cursor.space_after(SECTION_SPACING);
        Ok(())
    }

    fn render_metadata(&mut self, meta: &Meta) -> Result<(), Error> {
        let style = self.text_style(SIZE_TIMESTAMP, COLOR_TIMESTAMP);
        let left = self.layout.geometry().margin_left;

        let mut lines = Vec::new();
        if let Some(platform) = &meta.platform {
            lines.push(format!("Platform: {platform}"));
        }
        if let Some(created) = &meta.created_at {
            lines.push(format!("Created: {created}"));
        }
        if let Some(updated) = &meta.updated_at {
            lines.push(format!("Updated: {updated}"));
        }
        lines.push(format!("Exported: {}", self.exported_at));

        for line in lines {
            self.layout.ensure_space(LINE_HEIGHT)?;
            self.layout
                .surface
                .draw_text(&clean_text(&line), left, self.layout.cursor.y, &style);
            self.layout.cursor.advance(LINE_HEIGHT);
        }
        self.layout.cursor.space_after(SECTION_SPACING);
        Ok(())
    }

    fn render_message(&mut self, message: &Message, index: usize) -> Result<(), Error> {
        let config = self.config;
        let left = self.layout.geometry().margin_left;
        self.layout
            .ensure_space(line_advance(SIZE_SENDER) + MESSAGE_SPACING)?;

        self.anchors.push(MessageAnchor {
            index,
            page: self.layout.cursor.page,
            y: self.layout.cursor.y,
            sender: message.sender,
            preview: truncate(&message.display_text, PREVIEW_CHARS).to_string(),
            branch: message.branch_info,
        });

        let label = clean_text(&format!(
            "{index}. {}{}",
            message.sender.label(),
            message.branch_marker()
        ));
        let style = self.text_style(SIZE_SENDER, sender_color(message.sender));
        self.layout
            .surface
            .draw_text(&label, left, self.layout.cursor.y, &style);
        self.layout.cursor.advance(LINE_HEIGHT * 1.2);

        if config.include_timestamps
            && let Some(ts) = message.timestamp.as_deref().filter(|t| !t.is_empty())
        {
            self.layout.ensure_space(LINE_HEIGHT)?;
            let style = self.text_style(SIZE_TIMESTAMP, COLOR_TIMESTAMP);
            self.layout
                .surface
                .draw_text(&clean_text(ts), left, self.layout.cursor.y, &style);
            self.layout.cursor.advance(LINE_HEIGHT);
        }

        let is_human = message.sender == Sender::Human;
        if config.include_thinking
            && !is_human
            && let Some(thinking) = message.thinking.as_deref().filter(|t| !t.is_empty())
        {
            render_section(&mut self.layout, "Thinking", &clean_text(thinking))?;
        }

        if !message.display_text.is_empty() {
            self.render_body(&message.display_text)?;
        }

        if is_human && !message.attachments.is_empty() {
            let content = message
                .attachments
                .iter()
                .enumerate()
                .map(|(i, a)| {
                    format!(
                        "[{}] {} ({})",
                        i + 1,
                        a.file_name.as_deref().unwrap_or("file"),
                        a.file_type.as_deref().unwrap_or("unknown")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            render_section(&mut self.layout, "Attachments", &clean_text(&content))?;
        }

        if config.include_artifacts && !is_human {
            for artifact in &message.artifacts {
                let title = format!(
                    "Artifact: {}",
                    artifact.title.as_deref().unwrap_or("Untitled")
                );
                render_section(
                    &mut self.layout,
                    &clean_text(&title),
                    &clean_text(&artifact.content),
                )?;
            }
        }

        if config.include_tools {
            for tool in &message.tools {
                let title = format!("Tool: {}", tool.name.as_deref().unwrap_or("Unknown"));
                render_section(
                    &mut self.layout,
                    &clean_text(&title),
                    &clean_text(&tool_content(tool)),
                )?;
            }
        }

        if config.include_citations && !message.citations.is_empty() {
            let content = message
                .citations
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    let label = c
                        .title
                        .as_deref()
                        .or(c.url.as_deref())
                        .unwrap_or("Unknown");
                    format!("[{}] {label}", i + 1)
                })
                .collect::<Vec<_>>()
                .join("\n");
            render_section(&mut self.layout, "Citations", &clean_text(&content))?;
        }

        self.layout.cursor.space_after(MESSAGE_SPACING);
        Ok(())
    }

    fn render_body(&mut self, text: &str) -> Result<(), Error> {
        for part in split_fenced(&clean_text(text)) {
            match part {
                BodyPart::Text(prose) => render_markdown(&mut self.layout, &prose)?,
                BodyPart::Code { language, content } => {
                    render_code_block(&mut self.layout, &content, &language)?;
                }
            }
        }
        self.layout.cursor.space_after(LINE_HEIGHT);
        Ok(())
    }

    /// Table of contents on a fresh page after the last message. Returns the
    /// page it starts on and the number of entries drawn.
    fn render_toc(&mut self) -> Result<(usize, usize), Error> {
        self.layout.new_page()?;
        let toc_page = self.layout.cursor.page;
        let geo = self.layout.geometry();
        let left = geo.margin_left;
        let right = geo.right_edge();

        let heading = self.text_style(SIZE_H1, COLOR_TEXT);
        self.layout
            .surface
            .draw_text("Table of Contents", left, self.layout.cursor.y, &heading);
        self.layout.cursor.advance(LINE_HEIGHT * 2.0);

        let y = self.layout.cursor.y;
        self.layout.surface.stroke_line(
            (left, y),
            (right, y),
            Pen {
                color: COLOR_BORDER,
                width: mm(0.3),
            },
        );
        self.layout.cursor.advance(LINE_HEIGHT);

        let preview_style = self.text_style(SIZE_TIMESTAMP, COLOR_TIMESTAMP);
        let page_style = self.text_style(SIZE_BODY, COLOR_TIMESTAMP);
        let anchors = std::mem::take(&mut self.anchors);

        for anchor in &anchors {
            self.layout.ensure_space(TOC_ENTRY_ROOM)?;
            let y = self.layout.cursor.y;
            let target = LinkTarget::Page(anchor.page);

            let entry_style = self.text_style(SIZE_BODY, sender_color(anchor.sender));
            let entry = clean_text(&format!(
                "{}{}",
                anchor.title(),
                anchor.branch.map(|b| b.marker()).unwrap_or_default()
            ));
            let entry_x = left + mm(5.0);
            let entry_w = self.layout.measure(&entry, &entry_style);
            self.layout.surface.draw_text(&entry, entry_x, y, &entry_style);
            self.layout
                .surface
                .add_link(link_area(entry_x, y, entry_w, SIZE_BODY), target.clone());

            let page_label = format!("p.{}", anchor.page);
            let page_w = self.layout.measure(&page_label, &page_style);
            let page_x = right - page_w;
            self.layout
                .surface
                .draw_text(&page_label, page_x, y, &page_style);
            self.layout
                .surface
                .add_link(link_area(page_x, y, page_w, SIZE_BODY), target);

            let preview = toc_preview(&anchor.preview);
            if !preview.is_empty() {
                self.layout.cursor.advance(LINE_HEIGHT);
                self.layout.ensure_space(mm(SIZE_TIMESTAMP))?;
                self.layout.surface.draw_text(
                    &preview,
                    left + mm(10.0),
                    self.layout.cursor.y,
                    &preview_style,
                );
            }
            self.layout.cursor.advance(LINE_HEIGHT * 1.5);
        }

        let entries = anchors.len();
        self.anchors = anchors;
        Ok((toc_page, entries))
    }

    /// Separator, export stamp and `"i / N"` on every page. Runs last, so the
    /// page count is final; the cursor is not touched.
    fn render_footers(&mut self) {
        let total = self.layout.surface.page_count();
        let geo = self.layout.geometry();
        let style = self.text_style(SIZE_FOOTER, COLOR_FOOTER);
        let stamp = format!("Exported: {}", self.exported_at);
        let labels: Vec<(String, f32)> = (1..=total)
            .map(|i| {
                let label = format!("{i} / {total}");
                let width = self.layout.measure(&label, &style);
                (label, width)
            })
            .collect();

        let rule_y = geo.height - FOOTER_HEIGHT;
        let baseline = geo.height - FOOTER_BASELINE;
        let pen = Pen {
            color: COLOR_BORDER,
            width: mm(0.1),
        };
        let mut focus = self.layout.focus(1);
        for (i, (label, width)) in labels.iter().enumerate() {
            focus.switch(i + 1);
            focus.stroke_line((geo.margin_left, rule_y), (geo.right_edge(), rule_y), pen);
            focus.draw_text(&stamp, geo.margin_left, baseline, &style);
            focus.draw_text(label, geo.right_edge() - width, baseline, &style);
        }
    }
}

fn sender_color(sender: Sender) -> Rgb {
    match sender {
        Sender::Human => COLOR_HUMAN,
        Sender::Assistant => COLOR_ASSISTANT,
    }
}

fn link_area(x: f32, baseline: f32, width: f32, size: f32) -> Area {
    Area::new(x, baseline - size * 0.8, width, size)
}

fn tool_content(tool: &ToolCall) -> String {
    let input = serde_json::to_string_pretty(&tool.input).unwrap_or_default();
    let output = match &tool.output {
        None | Some(serde_json::Value::Null) => "N/A".to_string(),
        Some(serde_json::Value::String(s)) if s.is_empty() => "N/A".to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    format!("Input: {input}\n\nOutput: {output}")
}

/// Single-line TOC preview: newlines flattened, cut at [`PREVIEW_CHARS`] with
/// an ellipsis when the text was that long.
pub fn toc_preview(text: &str) -> String {
    let flat = clean_text(text).replace('\n', " ");
    let cut = truncate(&flat, PREVIEW_CHARS);
    if cut.chars().count() >= PREVIEW_CHARS {
        format!("{cut}...")
    } else {
        cut.to_string()
    }
}

/// Two-level outline: every human message is a root and the assistant
/// messages after it nest beneath it. Assistant messages before the first
/// human message stay at the root.
pub fn build_outline(anchors: &[MessageAnchor]) -> Vec<OutlineNode> {
    let mut roots: Vec<OutlineNode> = Vec::new();
    let mut seen_human = false;
    for anchor in anchors {
        let node = OutlineNode {
            title: anchor.title(),
            page: anchor.page,
            y: anchor.y,
            children: Vec::new(),
        };
        match anchor.sender {
            Sender::Human => {
                seen_human = true;
                roots.push(node);
            }
            Sender::Assistant => match roots.last_mut().filter(|_| seen_human) {
                Some(parent) => parent.children.push(node),
                None => roots.push(node),
            },
        }
    }
    roots
}
