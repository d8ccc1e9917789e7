//! Tile extraction - slicing a level into fixed-size tiles.

use crate::buffer::PixelBuffer;
use crate::canvas::VirtualCanvas;
use crate::pyramid::PyramidLevel;
use crate::{PanotileError, Result};

/// How tiles at the right/bottom edge of a level are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgePolicy {
    /// Edge tiles are emitted at their true clipped size.
    #[default]
    Crop,
    /// Every tile is emitted at exactly (tile_size + 2 * overlap) square;
    /// pixels outside the level are zero (black for RGB, transparent for
    /// RGBA).
    Pad,
}

/// One finished tile, ready for the output sink.
#[derive(Debug, Clone)]
pub struct Tile {
    pub level: u32,
    pub col: u32,
    pub row: u32,
    pub pixels: PixelBuffer,
}

/// External consumer of finished tiles (file writer, uploader, collector).
///
/// A write failure aborts the run; no retry is attempted and no atomicity
/// across tiles is promised.
pub trait TileSink {
    fn write_tile(&self, tile: &Tile) -> std::io::Result<()>;
}

/// Extracts tile (col, row) of the full-resolution level straight from the
/// canvas, so that level is never materialized as a whole.
pub fn canvas_tile(
    canvas: &VirtualCanvas,
    level: &PyramidLevel,
    col: u32,
    row: u32,
    overlap: u32,
    policy: EdgePolicy,
) -> Result<Tile> {
    let rect = level
        .tile_rect(col, row, overlap)
        .ok_or_else(|| bad_coord(level, col, row))?;
    let content = canvas.read_rect(rect)?;
    Ok(shape_tile(level, col, row, overlap, policy, content, rect.x0, rect.y0))
}

/// Extracts tile (col, row) of a coarser level from its materialized buffer.
pub fn buffer_tile(
    pixels: &PixelBuffer,
    level: &PyramidLevel,
    col: u32,
    row: u32,
    overlap: u32,
    policy: EdgePolicy,
) -> Result<Tile> {
    let rect = level
        .tile_rect(col, row, overlap)
        .ok_or_else(|| bad_coord(level, col, row))?;
    let content = pixels.crop(rect);
    Ok(shape_tile(level, col, row, overlap, policy, content, rect.x0, rect.y0))
}

fn bad_coord(level: &PyramidLevel, col: u32, row: u32) -> PanotileError {
    PanotileError::OutOfBounds {
        x0: col * level.tile_size,
        y0: row * level.tile_size,
        x1: (col + 1) * level.tile_size,
        y1: (row + 1) * level.tile_size,
        width: level.width,
        height: level.height,
    }
}

fn shape_tile(
    level: &PyramidLevel,
    col: u32,
    row: u32,
    overlap: u32,
    policy: EdgePolicy,
    content: PixelBuffer,
    content_x: u32,
    content_y: u32,
) -> Tile {
    let pixels = match policy {
        EdgePolicy::Crop => content,
        EdgePolicy::Pad => {
            let side = level.tile_size + 2 * overlap;
            // Nominal origin of the padded tile; negative at the left/top
            // borders where the overlap leaves the level.
            let origin_x = col as i64 * level.tile_size as i64 - overlap as i64;
            let origin_y = row as i64 * level.tile_size as i64 - overlap as i64;
            let mut padded = PixelBuffer::new(side, side, content.channels());
            padded.blit(
                &content,
                (content_x as i64 - origin_x) as u32,
                (content_y as i64 - origin_y) as u32,
            );
            padded
        }
    };
    Tile { level: level.index, col, row, pixels }
}
