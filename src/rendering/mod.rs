//! Wireframe rasterization pipeline for the fetch backend
//!
//! Turns a parsed HTML document into a PNG: block layout over the
//! viewport, a small display list, then pixel fill + encode. Text is
//! drawn as glyph bars, not shaped type; the goal is a faithful
//! page-shaped artifact, not typography.

pub mod layout;
pub mod paint;
pub mod raster;

use scraper::Html;

use crate::error::Result;
use crate::request::ClipRect;
use crate::Viewport;

/// A finished raster: final pixel dimensions plus encoded PNG bytes.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

/// Rasterize a document into a PNG.
///
/// The canvas is at least the viewport; content taller than the viewport
/// grows the canvas rather than being cut off. The clip rectangle, when
/// present, is applied to the finished canvas.
pub fn rasterize_document(
    document: &Html,
    viewport: Viewport,
    clip: Option<ClipRect>,
) -> Result<Screenshot> {
    let (blocks, content_height) = layout::layout_document(document, viewport);
    let height = viewport.height.max(content_height).max(1);
    let width = viewport.width.max(1);

    let commands = paint::build_display_list(&blocks);
    let mut frame = raster::rasterize(&commands, width, height);
    if let Some(clip) = clip {
        frame = raster::crop(&frame, clip);
    }

    let png_data = raster::encode_png(&frame)?;
    Ok(Screenshot {
        width: frame.width(),
        height: frame.height(),
        png_data,
    })
}
