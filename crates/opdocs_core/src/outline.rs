//! Markdown outline import and export.
//!
//! # Responsibility
//! - Read indented Markdown lists, headings and paragraphs into editor blocks.
//! - Print a document back, with linked task blocks as `- [#id] subject` and
//!   work-package references as `- [wp#id] subject`.
//!
//! # Invariants
//! - One indent level is two spaces or one tab.
//! - Blank lines produce no block.
//! - Parsing a rendered document yields the same kinds, levels, texts, checked states
//!   and work-package ids.

use crate::model::block::{BlockKind, TaskProps, WorkPackageProps};
use crate::surface::BlockSnapshot;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

const SPACES_PER_LEVEL: usize = 2;

static LIST_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<indent>[ \t]*)(?P<marker>[-*+]|\d{1,9}[.)])(?:[ \t]+(?P<body>.*))?$")
        .expect("valid list item regex")
});
static CHECKBOX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(?P<mark>[ xX])\](?:[ \t]+(?P<text>.*))?$").expect("valid checkbox regex")
});
static TASK_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[#(?P<id>\d+)\](?:[ \t]+(?P<text>.*))?$").expect("valid task ref regex")
});
static WP_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[wp#(?P<id>\d+)\](?:[ \t]+(?P<text>.*))?$").expect("valid reference regex")
});
static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}#{1,6}[ \t]+(?P<text>.*)$").expect("valid heading regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineParseError {
    /// List item indented by a space count that is not a whole level.
    OddIndent { line: usize, spaces: usize },
    /// List item indented with both tabs and spaces.
    MixedIndent { line: usize },
}

impl Display for OutlineParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OddIndent { line, spaces } => write!(
                f,
                "line {line}: indent of {spaces} spaces is not a multiple of {SPACES_PER_LEVEL}"
            ),
            Self::MixedIndent { line } => write!(f, "line {line}: indent mixes tabs and spaces"),
        }
    }
}

impl Error for OutlineParseError {}

/// Parses Markdown text into blocks in document order.
pub fn parse_outline(text: &str) -> Result<Vec<BlockSnapshot>, OutlineParseError> {
    let mut blocks = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;

        if let Some(caps) = LIST_ITEM_RE.captures(line) {
            let level = indent_level(&caps["indent"], line_no)?;
            let body = caps.name("body").map_or("", |body| body.as_str()).trim();
            let numbered = caps["marker"].starts_with(|c: char| c.is_ascii_digit());
            blocks.push(list_block(level, body, numbered));
            continue;
        }
        if let Some(caps) = HEADING_RE.captures(line) {
            blocks.push(BlockSnapshot::new(
                BlockKind::Heading,
                0,
                caps["text"].trim(),
            ));
            continue;
        }
        blocks.push(BlockSnapshot::new(BlockKind::Paragraph, 0, line.trim()));
    }
    Ok(blocks)
}

/// Renders blocks back to Markdown.
pub fn render_outline(blocks: &[BlockSnapshot]) -> String {
    let mut out = String::new();
    for block in blocks {
        let indent = " ".repeat(block.indent_level as usize * SPACES_PER_LEVEL);
        match block.kind {
            BlockKind::Paragraph => {
                out.push_str(&block.text);
                out.push_str("\n\n");
            }
            BlockKind::Heading => {
                out.push_str("# ");
                out.push_str(&block.text);
                out.push_str("\n\n");
            }
            BlockKind::BulletListItem => push_item(&mut out, &indent, "-", &block.text),
            BlockKind::NumberedListItem => push_item(&mut out, &indent, "1.", &block.text),
            BlockKind::CheckListItem => {
                let marker = if block.checked { "- [x]" } else { "- [ ]" };
                push_item(&mut out, &indent, marker, &block.text)
            }
            BlockKind::Task => match block.work_package_id() {
                Some(wp_id) => push_item(&mut out, &indent, &format!("- [#{wp_id}]"), &block.text),
                None => push_item(&mut out, &indent, "- [ ]", &block.text),
            },
            BlockKind::WorkPackage => match block.work_package_id() {
                Some(wp_id) => {
                    push_item(&mut out, &indent, &format!("- [wp#{wp_id}]"), &block.text)
                }
                None => push_item(&mut out, &indent, "-", &block.text),
            },
        }
    }
    out
}

fn push_item(out: &mut String, indent: &str, marker: &str, text: &str) {
    out.push_str(indent);
    out.push_str(marker);
    if !text.is_empty() {
        out.push(' ');
        out.push_str(text);
    }
    out.push('\n');
}

fn list_block(level: u32, body: &str, numbered: bool) -> BlockSnapshot {
    if let Some(caps) = TASK_REF_RE.captures(body) {
        let subject = caps.name("text").map_or("", |text| text.as_str()).trim();
        let props = TaskProps {
            work_package_id: Some(caps["id"].to_string()),
            ..TaskProps::draft(subject, None)
        };
        return BlockSnapshot::task(level, props);
    }
    if let Some(caps) = WP_REF_RE.captures(body) {
        let subject = caps.name("text").map_or("", |text| text.as_str()).trim();
        return BlockSnapshot::work_package(
            level,
            WorkPackageProps::unresolved(&caps["id"], subject),
        );
    }
    if let Some(caps) = CHECKBOX_RE.captures(body) {
        let text = caps.name("text").map_or("", |text| text.as_str()).trim();
        return BlockSnapshot::check_item(level, text, &caps["mark"] != " ");
    }
    let kind = if numbered {
        BlockKind::NumberedListItem
    } else {
        BlockKind::BulletListItem
    };
    BlockSnapshot::new(kind, level, body)
}

fn indent_level(indent: &str, line: usize) -> Result<u32, OutlineParseError> {
    let tabs = indent.chars().filter(|c| *c == '\t').count();
    let spaces = indent.len() - tabs;
    if tabs > 0 && spaces > 0 {
        return Err(OutlineParseError::MixedIndent { line });
    }
    if spaces % SPACES_PER_LEVEL != 0 {
        return Err(OutlineParseError::OddIndent { line, spaces });
    }
    Ok((tabs + spaces / SPACES_PER_LEVEL) as u32)
}
