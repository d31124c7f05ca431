use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    #[default]
    #[serde(alias = "user")]
    Human,
    #[serde(alias = "ai", alias = "model")]
    Assistant,
}

impl Sender {
    pub fn label(self) -> &'static str {
        match self {
            Sender::Human => "Human",
            Sender::Assistant => "Assistant",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct BranchInfo {
    #[serde(default, rename = "isBranchPoint", alias = "is_branch_point")]
    pub is_branch_point: bool,
    #[serde(default, rename = "childCount", alias = "child_count")]
    pub child_count: u32,
}

impl BranchInfo {
    /// `" [Branch N]"` for branch points, empty otherwise.
    pub fn marker(&self) -> String {
        if self.is_branch_point {
            format!(" [Branch {}]", self.child_count)
        } else {
            String::new()
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Attachment {
    #[serde(default, alias = "name")]
    pub file_name: Option<String>,
    #[serde(default, alias = "type")]
    pub file_type: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Artifact {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub input: serde_json::Value,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub sender: Sender,
    #[serde(default, alias = "text")]
    pub display_text: String,
    #[serde(default)]
    pub thinking: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub tools: Vec<ToolCall>,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, rename = "branchInfo", alias = "branch_info")]
    pub branch_info: Option<BranchInfo>,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Message {
            sender,
            display_text: text.into(),
            ..Default::default()
        }
    }

    pub fn branch_marker(&self) -> String {
        self.branch_info.map(|b| b.marker()).unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub meta: Meta,
    pub messages: Vec<Message>,
}

impl Transcript {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let transcript: Transcript = serde_json::from_str(json)?;
        Ok(transcript)
    }

    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => Error::Io(
                std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())),
            ),
            _ => Error::Io(e),
        })?;
        Self::from_json(&json)
    }
}

const MM: f32 = 72.0 / 25.4;

/// Named page sizes accepted by `PageFormat::Custom`, in points (portrait).
const NAMED_SIZES: &[(&str, f32, f32)] = &[
    ("a3", 297.0 * MM, 420.0 * MM),
    ("a5", 148.0 * MM, 210.0 * MM),
    ("b5", 176.0 * MM, 250.0 * MM),
    ("legal", 612.0, 1008.0),
    ("tabloid", 792.0, 1224.0),
];

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(from = "String")]
pub enum PageFormat {
    #[default]
    A4,
    Letter,
    Custom(String),
}

impl PageFormat {
    /// Page (width, height) in points. Unknown custom names fall back to A4.
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageFormat::A4 => (210.0 * MM, 297.0 * MM),
            PageFormat::Letter => (612.0, 792.0),
            PageFormat::Custom(name) => {
                match NAMED_SIZES.iter().find(|(n, _, _)| n.eq_ignore_ascii_case(name)) {
                    Some(&(_, w, h)) => (w, h),
                    None => {
                        log::warn!("Unknown page format {name:?} — using A4");
                        PageFormat::A4.dimensions()
                    }
                }
            }
        }
    }
}

impl FromStr for PageFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Ok(match name.as_str() {
            "a4" => PageFormat::A4,
            "letter" => PageFormat::Letter,
            _ => PageFormat::Custom(name),
        })
    }
}

impl From<String> for PageFormat {
    fn from(s: String) -> Self {
        let Ok(format) = s.parse::<PageFormat>();
        format
    }
}

/// Immutable snapshot of the export toggles, resolved once per export.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportConfig {
    pub include_thinking: bool,
    pub include_artifacts: bool,
    pub include_timestamps: bool,
    pub include_tools: bool,
    pub include_citations: bool,
    pub page_format: PageFormat,
    /// Hard cap on physical pages; exceeding it aborts the export.
    pub page_limit: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            include_thinking: true,
            include_artifacts: true,
            include_timestamps: false,
            include_tools: true,
            include_citations: true,
            page_format: PageFormat::A4,
            page_limit: 5000,
        }
    }
}

impl ExportConfig {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
