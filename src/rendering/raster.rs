//! Pixel fill and PNG encoding

use image::{Rgba, RgbaImage};

use crate::error::{Error, Result};
use crate::rendering::layout::{GLYPH_WIDTH, LINE_HEIGHT};
use crate::rendering::paint::{PaintCommand, BACKGROUND};
use crate::request::ClipRect;

/// Execute a display list into an RGBA canvas of the given size.
pub fn rasterize(commands: &[PaintCommand], width: u32, height: u32) -> RgbaImage {
    let mut frame = RgbaImage::from_pixel(width, height, to_pixel(BACKGROUND));

    for command in commands {
        match *command {
            PaintCommand::Clear { rgba } => {
                for pixel in frame.pixels_mut() {
                    *pixel = to_pixel(rgba);
                }
            }
            PaintCommand::Fill {
                x,
                y,
                width,
                height,
                rgba,
            } => fill_rect(&mut frame, x, y, width, height, rgba),
            PaintCommand::TextRun {
                x,
                y,
                chars,
                scale,
                rgba,
            } => {
                // one bar per glyph cell, with a small gap between cells
                let cell = (GLYPH_WIDTH * scale) as i32;
                let bar_width = (GLYPH_WIDTH - 2) * scale;
                let bar_height = (LINE_HEIGHT - 1) * scale;
                for index in 0..chars as i32 {
                    fill_rect(&mut frame, x + index * cell, y, bar_width, bar_height, rgba);
                }
            }
        }
    }

    frame
}

/// Cut the clip rectangle out of the frame.
///
/// The output always has the clip's dimensions; regions of the clip that
/// fall outside the frame stay background-colored.
pub fn crop(frame: &RgbaImage, clip: ClipRect) -> RgbaImage {
    let width = clip.width.max(1);
    let height = clip.height.max(1);
    let mut out = RgbaImage::from_pixel(width, height, to_pixel(BACKGROUND));

    for out_y in 0..height {
        for out_x in 0..width {
            let src_x = clip.left + out_x as i32;
            let src_y = clip.top + out_y as i32;
            if src_x >= 0
                && src_y >= 0
                && (src_x as u32) < frame.width()
                && (src_y as u32) < frame.height()
            {
                out.put_pixel(out_x, out_y, *frame.get_pixel(src_x as u32, src_y as u32));
            }
        }
    }

    out
}

/// Encode the frame as PNG bytes.
pub fn encode_png(frame: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    frame
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| Error::Render(format!("PNG encode failed: {}", e)))?;
    Ok(buf)
}

fn to_pixel(rgba: (u8, u8, u8, u8)) -> Rgba<u8> {
    Rgba([rgba.0, rgba.1, rgba.2, rgba.3])
}

fn fill_rect(frame: &mut RgbaImage, x: i32, y: i32, width: u32, height: u32, rgba: (u8, u8, u8, u8)) {
    let x0 = x.max(0) as u32;
    let y0 = y.max(0) as u32;
    let x1 = (x.saturating_add(width as i32)).max(0) as u32;
    let y1 = (y.saturating_add(height as i32)).max(0) as u32;
    let pixel = to_pixel(rgba);
    for py in y0..y1.min(frame.height()) {
        for px in x0..x1.min(frame.width()) {
            frame.put_pixel(px, py, pixel);
        }
    }
}
