//! Pixel sources - the decode capability behind the virtual canvas.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::buffer::{PixelBuffer, PixelFormat, Rect};
use crate::{PanotileError, Result};

/// One physical image exposed as rectangle reads.
///
/// Callers must only request rectangles inside the source's own bounds;
/// anything else is an `OutOfBounds` invariant violation.
pub trait PixelSource: Send + Sync {
    /// Identifier used in diagnostics (typically the file path).
    fn id(&self) -> &str;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn channels(&self) -> u8;
    fn read_rect(&self, rect: Rect) -> Result<PixelBuffer>;
    /// Drops any cached decode. Reading again after a release is valid.
    fn release(&self) {}
}

fn check_bounds(rect: Rect, w: u32, h: u32) -> Result<()> {
    if rect.fits(w, h) {
        Ok(())
    } else {
        Err(PanotileError::OutOfBounds {
            x0: rect.x0,
            y0: rect.y0,
            x1: rect.x1,
            y1: rect.y1,
            width: w,
            height: h,
        })
    }
}

/// Image file decoded lazily on first read and cached until released.
///
/// Dimensions are probed from the header at open time, so a canvas can be
/// laid out over many files without decoding any of them.
pub struct FileSource {
    path: PathBuf,
    id: String,
    width: u32,
    height: u32,
    format: PixelFormat,
    cache: Mutex<Option<Arc<PixelBuffer>>>,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>, format: PixelFormat) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let id = path.display().to_string();
        let (width, height) = image::image_dimensions(&path)
            .map_err(|source| PanotileError::Decode { path: id.clone(), source })?;
        Ok(Self { path, id, width, height, format, cache: Mutex::new(None) })
    }

    fn pixels(&self) -> Result<Arc<PixelBuffer>> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pixels) = cache.as_ref() {
            return Ok(Arc::clone(pixels));
        }
        let decoded = image::open(&self.path)
            .map_err(|source| PanotileError::Decode { path: self.id.clone(), source })?;
        let raw = match self.format {
            PixelFormat::Rgb => decoded.into_rgb8().into_raw(),
            PixelFormat::Rgba => decoded.into_rgba8().into_raw(),
        };
        // A file whose decoded size disagrees with its header is corrupt.
        let pixels = PixelBuffer::from_raw(self.width, self.height, self.format.channels(), raw)
            .map(Arc::new)
            .ok_or_else(|| PanotileError::Decode {
                path: self.id.clone(),
                source: image::ImageError::Limits(image::error::LimitError::from_kind(
                    image::error::LimitErrorKind::DimensionError,
                )),
            })?;
        *cache = Some(Arc::clone(&pixels));
        Ok(pixels)
    }
}

impl PixelSource for FileSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn channels(&self) -> u8 {
        self.format.channels()
    }

    fn read_rect(&self, rect: Rect) -> Result<PixelBuffer> {
        check_bounds(rect, self.width, self.height)?;
        let pixels = self.pixels()?;
        Ok(pixels.crop(rect))
    }

    fn release(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        *cache = None;
    }
}

/// Already-decoded pixels wrapped as a source. Used by embedders and tests.
pub struct MemorySource {
    id: String,
    pixels: PixelBuffer,
}

impl MemorySource {
    pub fn new(id: impl Into<String>, pixels: PixelBuffer) -> Self {
        Self { id: id.into(), pixels }
    }
}

impl PixelSource for MemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn channels(&self) -> u8 {
        self.pixels.channels()
    }

    fn read_rect(&self, rect: Rect) -> Result<PixelBuffer> {
        check_bounds(rect, self.pixels.width(), self.pixels.height())?;
        Ok(self.pixels.crop(rect))
    }
}
