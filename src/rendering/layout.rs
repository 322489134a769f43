//! Block layout over a viewport

use crate::Viewport;
use scraper::{Html, Selector};

/// Glyph cell width in pixels at scale 1.
pub const GLYPH_WIDTH: u32 = 8;
/// Line height in pixels at scale 1.
pub const LINE_HEIGHT: u32 = 8;
/// Horizontal page margin.
pub const PAGE_MARGIN: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading,
    Paragraph,
}

/// A laid-out block: its rectangle, wrapped text lines and draw scale.
#[derive(Debug, Clone)]
pub struct LayoutBlock {
    pub rect: Rect,
    pub lines: Vec<String>,
    pub kind: BlockKind,
    pub scale: u32,
    pub padding: u32,
}

/// Compute a basic block layout for the document and viewport.
///
/// Stacks blocks vertically: one heading (the first `h1`, falling back to
/// `<title>`) at scale 2, then every paragraph at scale 1. Returns the
/// blocks plus total content height, which may exceed the viewport; the
/// caller decides whether the canvas grows.
pub fn layout_document(document: &Html, viewport: Viewport) -> (Vec<LayoutBlock>, u32) {
    let page_width = viewport.width;
    let mut y = PAGE_MARGIN;
    let mut blocks = Vec::new();

    let h1_sel = Selector::parse("h1").unwrap();
    let title_sel = Selector::parse("title").unwrap();
    let heading_text = document
        .select(&h1_sel)
        .next()
        .or_else(|| document.select(&title_sel).next())
        .map(|n| n.text().collect::<String>())
        .unwrap_or_default();

    if !heading_text.trim().is_empty() {
        let block = wrap_block(
            heading_text.trim(),
            BlockKind::Heading,
            2,
            PAGE_MARGIN,
            y,
            page_width,
        );
        y = y + block.rect.height + PAGE_MARGIN;
        blocks.push(block);
    }

    let p_sel = Selector::parse("p").unwrap();
    for paragraph in document.select(&p_sel) {
        let text = paragraph.text().collect::<String>();
        if text.trim().is_empty() {
            continue;
        }
        let block = wrap_block(text.trim(), BlockKind::Paragraph, 1, PAGE_MARGIN, y, page_width);
        y = y + block.rect.height + 6;
        blocks.push(block);
    }

    (blocks, y)
}

fn wrap_block(
    text: &str,
    kind: BlockKind,
    scale: u32,
    x: u32,
    y: u32,
    page_width: u32,
) -> LayoutBlock {
    let padding = match kind {
        BlockKind::Heading => 8,
        BlockKind::Paragraph => 6,
    };
    let width = page_width.saturating_sub(PAGE_MARGIN * 2);
    let content_width = width.saturating_sub(padding * 2);
    let glyph = GLYPH_WIDTH * scale;
    let chars_per_line = if content_width >= glyph {
        (content_width / glyph) as usize
    } else {
        1
    };

    let lines = wrap_text(text, chars_per_line);
    let line_count = lines.len().max(1) as u32;
    let height = line_count * LINE_HEIGHT * scale + padding * 2;

    LayoutBlock {
        rect: Rect {
            x: x as i32,
            y: y as i32,
            width,
            height,
        },
        lines,
        kind,
        scale,
        padding,
    }
}

fn wrap_text(text: &str, chars_per_line: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + word.len() + 1 > chars_per_line {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
