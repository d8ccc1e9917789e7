//! Interleaved 8-bit pixel buffers and the rectangle type used to address them.

use image::DynamicImage;

/// Channel layout shared by every source of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn channels(self) -> u8 {
        match self {
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

/// Half-open rectangle: x in [x0, x1), y in [y0, y1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Rect {
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    /// True when the rectangle is non-degenerate and fits inside `w`×`h`.
    pub fn fits(&self, w: u32, h: u32) -> bool {
        self.x0 < self.x1 && self.y0 < self.y1 && self.x1 <= w && self.y1 <= h
    }
}

/// Owned interleaved pixel storage, row-major, `channels` bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Zero-filled buffer (black for RGB, transparent for RGBA).
    pub fn new(width: u32, height: u32, channels: u8) -> Self {
        let len = width as usize * height as usize * channels as usize;
        Self { width, height, channels, data: vec![0; len] }
    }

    /// Wraps raw interleaved bytes. Returns None on length mismatch.
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return None;
        }
        Some(Self { width, height, channels, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn row_bytes(&self) -> usize {
        self.width as usize * self.channels as usize
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let rb = self.row_bytes();
        let start = y as usize * rb;
        &self.data[start..start + rb]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let rb = self.row_bytes();
        let start = y as usize * rb;
        &mut self.data[start..start + rb]
    }

    /// Channel values of the pixel at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let ch = self.channels as usize;
        let start = x as usize * ch;
        &self.row(y)[start..start + ch]
    }

    /// Copies the whole of `src` into self with its top-left at (dst_x, dst_y).
    /// The source must fit; channel counts must match.
    pub fn blit(&mut self, src: &PixelBuffer, dst_x: u32, dst_y: u32) {
        debug_assert_eq!(self.channels, src.channels);
        debug_assert!(dst_x + src.width <= self.width);
        debug_assert!(dst_y + src.height <= self.height);
        let ch = self.channels as usize;
        let start = dst_x as usize * ch;
        let len = src.row_bytes();
        for y in 0..src.height {
            let dst_row = self.row_mut(dst_y + y);
            dst_row[start..start + len].copy_from_slice(src.row(y));
        }
    }

    /// Copies out the given sub-rectangle. The rect must fit.
    pub fn crop(&self, rect: Rect) -> PixelBuffer {
        debug_assert!(rect.fits(self.width, self.height));
        let ch = self.channels as usize;
        let mut out = PixelBuffer::new(rect.width(), rect.height(), self.channels);
        let start = rect.x0 as usize * ch;
        let len = rect.width() as usize * ch;
        for y in 0..rect.height() {
            let src_row = self.row(rect.y0 + y);
            out.row_mut(y).copy_from_slice(&src_row[start..start + len]);
        }
        out
    }

    /// View as an `image` buffer for encoding. None for unsupported channel counts.
    pub fn to_image(&self) -> Option<DynamicImage> {
        match self.channels {
            3 => image::RgbImage::from_raw(self.width, self.height, self.data.clone())
                .map(DynamicImage::ImageRgb8),
            4 => image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
                .map(DynamicImage::ImageRgba8),
            _ => None,
        }
    }
}
