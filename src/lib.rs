//! Slice panoramic image strips into a DeepZoom tile pyramid.
//!
//! A row of same-height images is exposed as one virtual canvas and cut into
//! a multi-resolution tile pyramid. The full-resolution level is read from
//! the sources tile by tile and never materialized; coarser levels are built
//! by area-averaging, holding at most two level buffers at a time.

pub mod buffer;
pub mod canvas;
pub mod downsample;
pub mod dzi;
pub mod extract;
pub mod pyramid;
pub mod source;

pub use buffer::{PixelBuffer, PixelFormat, Rect};
pub use canvas::VirtualCanvas;
pub use extract::{EdgePolicy, Tile, TileSink};
pub use pyramid::{Pyramid, PyramidLevel};
pub use source::{FileSource, MemorySource, PixelSource};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PanotileError {
    #[error("no input images were given")]
    EmptyInput,
    #[error("source {path}: height {actual} does not match expected {expected}")]
    HeightMismatch { path: String, actual: u32, expected: u32 },
    #[error("source {path}: {channels}-channel pixels, expected {expected}")]
    ChannelMismatch { path: String, channels: u8, expected: u8 },
    #[error("failed to decode {path}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("rect ({x0},{y0})..({x1},{y1}) out of bounds for {width}x{height} surface")]
    OutOfBounds { x0: u32, y0: u32, x1: u32, y1: u32, width: u32, height: u32 },
    #[error("failed to write tile {level}/{col}_{row}")]
    SinkWrite {
        level: u32,
        col: u32,
        row: u32,
        #[source]
        source: std::io::Error,
    },
    #[error("run cancelled")]
    Cancelled,
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PanotileError>;

/// Shared flag for aborting a run from another thread. The run loop checks it
/// at band and level boundaries; tiles already in flight finish, but nothing
/// further reaches the sink.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Drives a whole run: plans the pyramid, streams the finest level out of the
/// canvas in vertical bands, then walks the coarser levels with a two-buffer
/// rotation.
pub struct Tiler {
    canvas: VirtualCanvas,
    tile_size: u32,
    overlap: u32,
    edge_policy: EdgePolicy,
    cancel: CancelToken,
}

impl Tiler {
    pub fn new(canvas: VirtualCanvas) -> Self {
        Self {
            canvas,
            tile_size: 256,
            overlap: 0,
            edge_policy: EdgePolicy::Crop,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        assert!(tile_size > 0, "tile size must be positive");
        self.tile_size = tile_size;
        self
    }

    /// Pixel border added symmetrically around every tile, clamped at level
    /// borders (DeepZoom overlap convention).
    pub fn with_overlap(mut self, overlap: u32) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_edge_policy(mut self, policy: EdgePolicy) -> Self {
        self.edge_policy = policy;
        self
    }

    pub fn canvas(&self) -> &VirtualCanvas {
        &self.canvas
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn overlap(&self) -> u32 {
        self.overlap
    }

    /// Token for aborting the run from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The level chain this run will produce.
    pub fn pyramid(&self) -> Pyramid {
        pyramid::plan(self.canvas.width(), self.canvas.height(), self.tile_size)
    }

    /// Everything a manifest writer needs about this run.
    pub fn descriptor(&self, tile_format: &str) -> dzi::Descriptor {
        dzi::Descriptor::new(&self.pyramid(), self.overlap, tile_format)
    }

    /// Runs the whole pyramid through the sink, finest level first.
    ///
    /// Within a level, tiles are extracted in parallel; levels themselves are
    /// strictly ordered. Memory stays bounded by two level buffers plus the
    /// source decodes spanned by the current band.
    pub fn run<S: TileSink + Sync>(&self, sink: &S) -> Result<()> {
        let pyramid = self.pyramid();
        let levels = pyramid.levels();
        let finest = &levels[0];
        info!(
            width = finest.width,
            height = finest.height,
            levels = levels.len(),
            sources = self.canvas.source_count(),
            "tiling panorama"
        );

        // The first coarse level is assembled band by band while the finest
        // level streams out of the canvas, so each source decodes once.
        let mut next = (levels.len() > 1)
            .then(|| PixelBuffer::new(levels[1].width, levels[1].height, self.canvas.channels()));

        info!(level = finest.index, tiles = finest.tile_count(), "emitting level");
        let band_width = 2 * self.tile_size;
        let mut band_start = 0u32;
        while band_start < finest.width {
            self.ensure_live()?;
            let band_end = (band_start + band_width).min(finest.width);
            let col_end = band_end.div_ceil(self.tile_size).min(finest.columns());
            let coords = grid(band_start / self.tile_size..col_end, finest.rows());
            coords.par_iter().try_for_each(|&(col, row)| {
                let tile = extract::canvas_tile(
                    &self.canvas,
                    finest,
                    col,
                    row,
                    self.overlap,
                    self.edge_policy,
                )?;
                self.write(sink, tile)
            })?;
            if let Some(buf) = next.as_mut() {
                let band =
                    self.canvas.read_rect(Rect::new(band_start, 0, band_end, finest.height))?;
                downsample::reduce_into(&band, buf, band_start / 2);
            }
            debug!(band_start, band_end, "band done");
            self.canvas.release_through(band_end.saturating_sub(self.overlap));
            band_start = band_end;
        }
        self.canvas.release_all();

        let Some(mut current) = next else {
            return Ok(());
        };
        for (i, level) in levels.iter().enumerate().skip(1) {
            self.ensure_live()?;
            debug_assert_eq!((current.width(), current.height()), (level.width, level.height));
            info!(level = level.index, tiles = level.tile_count(), "emitting level");
            let coords = grid(0..level.columns(), level.rows());
            let pixels = &current;
            coords.par_iter().try_for_each(|&(col, row)| {
                let tile =
                    extract::buffer_tile(pixels, level, col, row, self.overlap, self.edge_policy)?;
                self.write(sink, tile)
            })?;
            if i + 1 < levels.len() {
                current = downsample::reduce(&current);
            }
        }
        Ok(())
    }

    fn ensure_live(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(PanotileError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn write<S: TileSink>(&self, sink: &S, tile: Tile) -> Result<()> {
        sink.write_tile(&tile).map_err(|source| PanotileError::SinkWrite {
            level: tile.level,
            col: tile.col,
            row: tile.row,
            source,
        })
    }
}

fn grid(cols: std::ops::Range<u32>, rows: u32) -> Vec<(u32, u32)> {
    let mut coords = Vec::with_capacity(cols.len() * rows as usize);
    for col in cols {
        for row in 0..rows {
            coords.push((col, row));
        }
    }
    coords
}
