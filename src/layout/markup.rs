//! Inline markup tokenizer and the line-level grammar of message bodies.

use std::ops::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    Plain,
    Bold,
    Italic,
    BoldItalic,
    Code,
    Link,
    /// Plain text of a heading line of the given level (1-6).
    Heading(u8),
}

/// A run of text sharing one inline style. `span` is the byte range of the
/// source line the segment was produced from, markup included.
#[derive(Clone, Debug, PartialEq)]
pub struct StyledSegment {
    pub kind: SegmentKind,
    pub text: String,
    pub url: Option<String>,
    pub span: Range<usize>,
}

impl StyledSegment {
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        let len = text.len();
        StyledSegment {
            kind: SegmentKind::Plain,
            text,
            url: None,
            span: 0..len,
        }
    }
}

#[derive(Clone, Debug)]
struct Match {
    kind: SegmentKind,
    span: Range<usize>,
    text: Range<usize>,
    url: Option<Range<usize>>,
}

/// Maximal run of one marker character.
#[derive(Clone, Copy, Debug)]
struct Run {
    start: usize,
    len: usize,
}

impl Run {
    fn end(&self) -> usize {
        self.start + self.len
    }
}

fn marker_runs(line: &str, marker: u8) -> Vec<Run> {
    let bytes = line.as_bytes();
    let mut runs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == marker {
            let start = i;
            while i < bytes.len() && bytes[i] == marker {
                i += 1;
            }
            runs.push(Run {
                start,
                len: i - start,
            });
        } else {
            i += 1;
        }
    }
    runs
}

fn char_before(line: &str, idx: usize) -> Option<char> {
    line[..idx].chars().next_back()
}

fn char_after(line: &str, idx: usize) -> Option<char> {
    line[idx..].chars().next()
}

fn is_word(c: Option<char>) -> bool {
    c.is_some_and(char::is_alphanumeric)
}

fn is_space(c: Option<char>) -> bool {
    c.is_none_or(char::is_whitespace)
}

/// A run with word characters on both sides (`2*3`, `snake_case`) is
/// literal text, never a delimiter.
fn intraword(line: &str, run: Run) -> bool {
    is_word(char_before(line, run.start)) && is_word(char_after(line, run.end()))
}

/// A run that can open emphasis: followed by non-space, and for `_` not
/// preceded by a word character.
fn can_open(line: &str, run: Run, marker: u8) -> bool {
    !is_space(char_after(line, run.end()))
        && !intraword(line, run)
        && (marker != b'_' || !is_word(char_before(line, run.start)))
}

/// A run that can close emphasis: preceded by non-space, and for `_` not
/// followed by a word character.
fn can_close(line: &str, run: Run, marker: u8) -> bool {
    !is_space(char_before(line, run.start))
        && !intraword(line, run)
        && (marker != b'_' || !is_word(char_after(line, run.end())))
}

/// Emphasis delimited by runs of exactly `n` markers. The closer is the next
/// run of length `n` that can close; runs of other lengths in between are
/// content.
fn match_delimited(line: &str, marker: u8, n: usize, kind: SegmentKind, out: &mut Vec<Match>) {
    let runs = marker_runs(line, marker);
    let mut i = 0;
    while i < runs.len() {
        let opener = runs[i];
        if opener.len != n || !can_open(line, opener, marker) {
            i += 1;
            continue;
        }
        let closer = (i + 1..runs.len())
            .find(|&j| runs[j].len == n && can_close(line, runs[j], marker));
        match closer {
            Some(j) => {
                out.push(Match {
                    kind,
                    span: opener.start..runs[j].end(),
                    text: opener.end()..runs[j].start,
                    url: None,
                });
                i = j + 1;
            }
            None => i += 1,
        }
    }
}

fn match_code(line: &str, out: &mut Vec<Match>) {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        match line[i + 1..].find('`') {
            Some(rel) if rel > 0 => {
                let close = i + 1 + rel;
                out.push(Match {
                    kind: SegmentKind::Code,
                    span: i..close + 1,
                    text: i + 1..close,
                    url: None,
                });
                i = close + 1;
            }
            _ => i += 1,
        }
    }
}

fn match_links(line: &str, out: &mut Vec<Match>) {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'[' {
            i += 1;
            continue;
        }
        let Some(rel_close) = line[i + 1..].find(']') else {
            break;
        };
        let close = i + 1 + rel_close;
        let url_start = close + 2;
        let url_close = (rel_close > 0 && bytes.get(close + 1) == Some(&b'('))
            .then(|| line[url_start..].find(')'))
            .flatten()
            .filter(|&rel| rel > 0)
            .map(|rel| url_start + rel);
        match url_close {
            Some(end) => {
                out.push(Match {
                    kind: SegmentKind::Link,
                    span: i..end + 1,
                    text: i + 1..close,
                    url: Some(url_start..end),
                });
                i = end + 1;
            }
            None => i += 1,
        }
    }
}

/// Leftover emphasis markers in plain text: runs of `*` or `_` of at most
/// three with whitespace (or the line edge) on exactly one side. Runs inside
/// a word or between two spaces are literal (`2*3`, `f(*args)`, `a * b`).
fn strip_dangling_markers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b != b'*' && b != b'_' {
            let ch_len = text[i..].chars().next().map_or(1, char::len_utf8);
            out.push_str(&text[i..i + ch_len]);
            i += ch_len;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i] == b {
            i += 1;
        }
        let before = char_before(text, start);
        let after = char_after(text, i);
        let dangling = is_space(before) != is_space(after);
        if i - start > 3 || !dangling {
            out.push_str(&text[start..i]);
        }
    }
    out
}

/// Collect matches in priority order, sort by start (stable, so priority
/// breaks ties) and keep the first of any overlapping set.
fn select(mut matches: Vec<Match>) -> Vec<Match> {
    matches.sort_by_key(|m| m.span.start);
    let mut kept: Vec<Match> = Vec::new();
    let mut last_end = 0;
    for m in matches {
        if m.span.start >= last_end {
            last_end = m.span.end;
            kept.push(m);
        }
    }
    kept
}

/// Build segments for `line[offset..]` from kept matches, filling gaps with
/// `gap_kind` segments. Spans are relative to the full line.
fn assemble(
    line: &str,
    offset: usize,
    kept: Vec<Match>,
    gap_kind: SegmentKind,
) -> Vec<StyledSegment> {
    let body = &line[offset..];
    let mut segments: Vec<StyledSegment> = Vec::new();
    let push_gap = |segments: &mut Vec<StyledSegment>, range: Range<usize>| {
        let text = strip_dangling_markers(&body[range.clone()]);
        segments.push(StyledSegment {
            kind: gap_kind,
            text,
            url: None,
            span: range.start + offset..range.end + offset,
        });
    };

    let mut pos = 0;
    for m in kept {
        if m.span.start > pos {
            push_gap(&mut segments, pos..m.span.start);
        }
        segments.push(StyledSegment {
            kind: m.kind,
            text: body[m.text].to_string(),
            url: m.url.map(|u| body[u].to_string()),
            span: m.span.start + offset..m.span.end + offset,
        });
        pos = m.span.end;
    }
    if pos < body.len() {
        push_gap(&mut segments, pos..body.len());
    }
    if let Some(first) = segments.first_mut() {
        first.span.start = 0;
    }
    merge_empty_gaps(segments, gap_kind)
}

/// Drop gap segments that became empty after marker cleanup, handing their
/// source range to a neighbour so coverage of the line is preserved.
fn merge_empty_gaps(segments: Vec<StyledSegment>, gap_kind: SegmentKind) -> Vec<StyledSegment> {
    let mut out: Vec<StyledSegment> = Vec::with_capacity(segments.len());
    let mut pending_start: Option<usize> = None;
    let total = segments.len();
    for seg in segments {
        if seg.kind == gap_kind && seg.text.is_empty() && total > 1 {
            match out.last_mut() {
                Some(prev) => prev.span.end = seg.span.end,
                None => pending_start = Some(seg.span.start),
            }
            continue;
        }
        let mut seg = seg;
        if let Some(start) = pending_start.take() {
            seg.span.start = start;
        }
        out.push(seg);
    }
    out
}

/// Level and byte length of a `#{1,6}` + whitespace heading prefix.
pub fn heading_prefix(line: &str) -> Option<(u8, usize)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let rest = &line[hashes..];
    let ws = rest.len() - rest.trim_start().len();
    if ws == 0 {
        return None;
    }
    Some((hashes as u8, hashes + ws))
}

/// Split one line into styled segments, left to right.
///
/// Spans cover the whole line without overlap. Unmatched markers never
/// swallow the rest of the line; leftovers are removed from plain text.
pub fn tokenize(line: &str) -> Vec<StyledSegment> {
    if line.is_empty() {
        return Vec::new();
    }

    if let Some((level, prefix)) = heading_prefix(line) {
        let body = &line[prefix..];
        let mut matches = Vec::new();
        match_delimited(body, b'*', 2, SegmentKind::Bold, &mut matches);
        match_delimited(body, b'_', 2, SegmentKind::Bold, &mut matches);
        let segments = assemble(line, prefix, select(matches), SegmentKind::Heading(level));
        if !segments.is_empty() {
            return segments;
        }
        return vec![StyledSegment {
            kind: SegmentKind::Heading(level),
            text: String::new(),
            url: None,
            span: 0..line.len(),
        }];
    }

    let mut matches = Vec::new();
    match_code(line, &mut matches);
    match_delimited(line, b'*', 3, SegmentKind::BoldItalic, &mut matches);
    match_delimited(line, b'_', 3, SegmentKind::BoldItalic, &mut matches);
    match_delimited(line, b'*', 2, SegmentKind::Bold, &mut matches);
    match_delimited(line, b'_', 2, SegmentKind::Bold, &mut matches);
    match_delimited(line, b'*', 1, SegmentKind::Italic, &mut matches);
    match_delimited(line, b'_', 1, SegmentKind::Italic, &mut matches);
    match_links(line, &mut matches);
    assemble(line, 0, select(matches), SegmentKind::Plain)
}

/// One piece of a code line: text and whether it is bold.
#[derive(Clone, Debug, PartialEq)]
pub struct CodePiece {
    pub text: String,
    pub bold: bool,
}

/// A code line with its `#` pseudo-heading level and `**bold**` pieces.
#[derive(Clone, Debug, PartialEq)]
pub struct CodeLine {
    pub heading: Option<u8>,
    pub pieces: Vec<CodePiece>,
}

pub fn parse_code_line(line: &str) -> CodeLine {
    if let Some((level, prefix)) = heading_prefix(line)
        && prefix < line.len()
    {
        return CodeLine {
            heading: Some(level),
            pieces: vec![CodePiece {
                text: line[prefix..].to_string(),
                bold: false,
            }],
        };
    }

    let mut pieces = Vec::new();
    let mut rest = line;
    while let Some(open) = rest.find("**") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("**").filter(|&c| c > 0) else {
            break;
        };
        if open > 0 {
            pieces.push(CodePiece {
                text: rest[..open].to_string(),
                bold: false,
            });
        }
        pieces.push(CodePiece {
            text: after[..close].to_string(),
            bold: true,
        });
        rest = &after[close + 2..];
    }
    if !rest.is_empty() || pieces.is_empty() {
        pieces.push(CodePiece {
            text: rest.to_string(),
            bold: false,
        });
    }
    CodeLine {
        heading: None,
        pieces,
    }
}

/// Part of a message body: prose or a fenced code block.
#[derive(Clone, Debug, PartialEq)]
pub enum BodyPart {
    Text(String),
    Code { language: String, content: String },
}

/// Split a body into prose and ```` ``` ```` fenced code blocks. The opening
/// fence carries an optional language tag; an unterminated fence stays prose.
/// Whitespace-only prose between blocks is dropped.
pub fn split_fenced(text: &str) -> Vec<BodyPart> {
    let mut parts = Vec::new();
    let mut pos = 0;
    let mut search = 0;

    while let Some(rel) = text[search..].find("```") {
        let open = search + rel;
        let after_ticks = open + 3;
        let Some(nl_rel) = text[after_ticks..].find('\n') else {
            break;
        };
        let newline = after_ticks + nl_rel;
        let language = text[after_ticks..newline].trim();
        let body_start = newline + 1;
        let Some(close_rel) = text[body_start..].find("```") else {
            break;
        };
        let close = body_start + close_rel;

        let before = &text[pos..open];
        if !before.trim().is_empty() {
            parts.push(BodyPart::Text(before.to_string()));
        }
        parts.push(BodyPart::Code {
            language: language.to_string(),
            content: text[body_start..close].to_string(),
        });
        pos = close + 3;
        search = pos;
    }

    let tail = &text[pos..];
    if !tail.trim().is_empty() || parts.is_empty() {
        parts.push(BodyPart::Text(tail.to_string()));
    }
    parts
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListMarker {
    Bullet,
    Ordered(u32),
}

/// Classification of one prose line.
#[derive(Clone, Debug, PartialEq)]
pub enum LineKind<'a> {
    Blank,
    Heading { level: u8, line: &'a str },
    Quote(&'a str),
    ListItem {
        depth: usize,
        marker: ListMarker,
        text: &'a str,
    },
    Paragraph(&'a str),
}

pub fn classify_line(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if let Some((level, _)) = heading_prefix(line) {
        return LineKind::Heading { level, line };
    }
    if let Some(rest) = line.strip_prefix('>') {
        let text = rest.trim_start();
        if text.len() < rest.len() || rest.is_empty() {
            return LineKind::Quote(text);
        }
    }

    let body = line.trim_start();
    let depth = line.len() - body.len();
    let mut chars = body.char_indices();
    if let Some((_, c @ ('-' | '*' | '+'))) = chars.next() {
        let rest = &body[c.len_utf8()..];
        let text = rest.trim_start();
        if text.len() < rest.len() && !text.is_empty() {
            return LineKind::ListItem {
                depth,
                marker: ListMarker::Bullet,
                text,
            };
        }
    }
    let digits = body.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0
        && let Some(rest) = body[digits..].strip_prefix('.')
    {
        let text = rest.trim_start();
        if text.len() < rest.len()
            && !text.is_empty()
            && let Ok(n) = body[..digits].parse::<u32>()
        {
            return LineKind::ListItem {
                depth,
                marker: ListMarker::Ordered(n),
                text,
            };
        }
    }
    LineKind::Paragraph(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_prefix_needs_whitespace() {
        assert_eq!(heading_prefix("## Title"), Some((2, 3)));
        assert_eq!(heading_prefix("#hashtag"), None);
        assert_eq!(heading_prefix("####### seven"), None);
    }

    #[test]
    fn strips_only_dangling_markers() {
        assert_eq!(strip_dangling_markers("**open"), "open");
        assert_eq!(strip_dangling_markers("2 * 3"), "2 * 3");
        assert_eq!(strip_dangling_markers("snake_case"), "snake_case");
        assert_eq!(strip_dangling_markers("2*3=6"), "2*3=6");
        assert_eq!(strip_dangling_markers("f(*args)"), "f(*args)");
        assert_eq!(strip_dangling_markers("tail__"), "tail");
    }
}
