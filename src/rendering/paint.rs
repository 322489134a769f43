//! Display-list construction

use crate::rendering::layout::{BlockKind, LayoutBlock, LINE_HEIGHT};

pub const BACKGROUND: (u8, u8, u8, u8) = (255, 255, 255, 255);
pub const HEADING_FILL: (u8, u8, u8, u8) = (235, 235, 235, 255);
pub const PARAGRAPH_FILL: (u8, u8, u8, u8) = (248, 248, 248, 255);
pub const TEXT_INK: (u8, u8, u8, u8) = (40, 40, 40, 255);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaintCommand {
    Clear {
        rgba: (u8, u8, u8, u8),
    },
    Fill {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: (u8, u8, u8, u8),
    },
    /// A run of `chars` glyph bars starting at (x, y).
    TextRun {
        x: i32,
        y: i32,
        chars: u32,
        scale: u32,
        rgba: (u8, u8, u8, u8),
    },
}

/// Flatten laid-out blocks into paint commands: background clear, one
/// fill per block, one text run per wrapped line.
pub fn build_display_list(blocks: &[LayoutBlock]) -> Vec<PaintCommand> {
    let mut commands = vec![PaintCommand::Clear { rgba: BACKGROUND }];

    for block in blocks {
        let fill = match block.kind {
            BlockKind::Heading => HEADING_FILL,
            BlockKind::Paragraph => PARAGRAPH_FILL,
        };
        commands.push(PaintCommand::Fill {
            x: block.rect.x,
            y: block.rect.y,
            width: block.rect.width,
            height: block.rect.height,
            rgba: fill,
        });

        let line_height = (LINE_HEIGHT * block.scale) as i32;
        for (index, line) in block.lines.iter().enumerate() {
            commands.push(PaintCommand::TextRun {
                x: block.rect.x + block.padding as i32,
                y: block.rect.y + block.padding as i32 + index as i32 * line_height,
                chars: line.chars().count() as u32,
                scale: block.scale,
                rgba: TEXT_INK,
            });
        }
    }

    commands
}
