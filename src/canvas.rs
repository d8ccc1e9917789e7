//! Virtual canvas - one addressable surface over an ordered row of sources.

use crate::buffer::{PixelBuffer, Rect};
use crate::source::PixelSource;
use crate::{PanotileError, Result};

struct Placed {
    offset: u32,
    width: u32,
    source: Box<dyn PixelSource>,
}

impl Placed {
    fn end(&self) -> u32 {
        self.offset + self.width
    }
}

impl std::fmt::Debug for Placed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Placed")
            .field("offset", &self.offset)
            .field("width", &self.width)
            .field("source", &self.source.id())
            .finish()
    }
}

/// Ordered sources composed side by side into a single pixel surface.
///
/// Total width is the sum of the source widths; height and channel count are
/// shared by every source. Rectangle reads resolve the owning sources through
/// a binary search on the offset index, so lookup cost does not grow with the
/// number of input files.
#[derive(Debug)]
pub struct VirtualCanvas {
    placed: Vec<Placed>,
    width: u32,
    height: u32,
    channels: u8,
}

impl VirtualCanvas {
    pub fn new(sources: Vec<Box<dyn PixelSource>>) -> Result<Self> {
        let first = sources.first().ok_or(PanotileError::EmptyInput)?;
        let height = first.height();
        let channels = first.channels();
        let mut placed = Vec::with_capacity(sources.len());
        let mut offset = 0u32;
        for source in sources {
            if source.height() != height {
                return Err(PanotileError::HeightMismatch {
                    path: source.id().to_string(),
                    actual: source.height(),
                    expected: height,
                });
            }
            if source.channels() != channels {
                return Err(PanotileError::ChannelMismatch {
                    path: source.id().to_string(),
                    channels: source.channels(),
                    expected: channels,
                });
            }
            let width = source.width();
            placed.push(Placed { offset, width, source });
            offset += width;
        }
        Ok(Self { placed, width: offset, height, channels })
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

    pub fn source_count(&self) -> usize {
        self.placed.len()
    }

    /// Reads an arbitrary rectangle, stitching across source seams.
    ///
    /// The pixel at global column x comes from local column (x - offset) of
    /// the owning source; seams are exact, with no blending, gap or overlap.
    pub fn read_rect(&self, rect: Rect) -> Result<PixelBuffer> {
        if !rect.fits(self.width, self.height) {
            return Err(PanotileError::OutOfBounds {
                x0: rect.x0,
                y0: rect.y0,
                x1: rect.x1,
                y1: rect.y1,
                width: self.width,
                height: self.height,
            });
        }
        let mut out = PixelBuffer::new(rect.width(), rect.height(), self.channels);
        let first = self.placed.partition_point(|p| p.end() <= rect.x0);
        for p in &self.placed[first..] {
            if p.offset >= rect.x1 {
                break;
            }
            let local_x0 = rect.x0.saturating_sub(p.offset);
            let local_x1 = (rect.x1 - p.offset).min(p.width);
            let piece = p
                .source
                .read_rect(Rect::new(local_x0, rect.y0, local_x1, rect.y1))?;
            out.blit(&piece, p.offset + local_x0 - rect.x0, 0);
        }
        Ok(out)
    }

    /// Drops cached decodes of every source whose span ends at or before
    /// global column x. Part of the streaming working-set discipline: as tile
    /// extraction sweeps left to right, sources already passed are evicted.
    pub fn release_through(&self, x: u32) {
        for p in &self.placed {
            if p.end() > x {
                break;
            }
            p.source.release();
        }
    }

    /// Drops every cached decode.
    pub fn release_all(&self) {
        for p in &self.placed {
            p.source.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PixelBuffer;
    use crate::source::MemorySource;

    /// Source of the given width filled with a single gray value.
    fn flat(id: &str, w: u32, h: u32, value: u8) -> Box<dyn PixelSource> {
        let data = vec![value; w as usize * h as usize * 3];
        let pixels = PixelBuffer::from_raw(w, h, 3, data).expect("sized to fit");
        Box::new(MemorySource::new(id, pixels))
    }

    /// Source whose pixel at (x, y) is [x, y, id] for seam checks.
    fn coords(id: u8, w: u32, h: u32) -> Box<dyn PixelSource> {
        let mut data = Vec::with_capacity(w as usize * h as usize * 3);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[x as u8, y as u8, id]);
            }
        }
        let pixels = PixelBuffer::from_raw(w, h, 3, data).expect("sized to fit");
        Box::new(MemorySource::new(format!("src-{id}"), pixels))
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            VirtualCanvas::new(Vec::new()).unwrap_err(),
            PanotileError::EmptyInput
        ));
    }

    #[test]
    fn height_mismatch_names_the_offender() {
        let err = VirtualCanvas::new(vec![flat("a", 4, 6, 0), flat("b", 4, 5, 0)]).unwrap_err();
        match err {
            PanotileError::HeightMismatch { path, actual, expected } => {
                assert_eq!(path, "b");
                assert_eq!(actual, 5);
                assert_eq!(expected, 6);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn width_is_sum_of_source_widths() {
        let canvas =
            VirtualCanvas::new(vec![flat("a", 3, 4, 0), flat("b", 5, 4, 0), flat("c", 2, 4, 0)])
                .expect("valid sources");
        assert_eq!(canvas.width(), 10);
        assert_eq!(canvas.height(), 4);
    }

    #[test]
    fn rect_inside_one_source_matches_that_source() {
        let canvas = VirtualCanvas::new(vec![coords(0, 6, 4), coords(1, 6, 4)])
            .expect("valid sources");
        // Fully inside the second source: global x 7..10 is local x 1..4.
        let buf = canvas.read_rect(Rect::new(7, 1, 10, 3)).expect("in bounds");
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(buf.pixel(x, y), &[(x + 1) as u8, (y + 1) as u8, 1]);
            }
        }
    }

    #[test]
    fn seam_columns_are_exact() {
        let canvas = VirtualCanvas::new(vec![coords(0, 6, 4), coords(1, 5, 4)])
            .expect("valid sources");
        let buf = canvas.read_rect(Rect::new(4, 0, 8, 1)).expect("in bounds");
        // Global column 5 is the last column of the left source,
        // global column 6 the first of the right.
        assert_eq!(buf.pixel(1, 0), &[5, 0, 0]);
        assert_eq!(buf.pixel(2, 0), &[0, 0, 1]);
    }

    #[test]
    fn rect_spanning_three_sources() {
        let canvas =
            VirtualCanvas::new(vec![flat("a", 2, 3, 10), flat("b", 2, 3, 20), flat("c", 2, 3, 30)])
                .expect("valid sources");
        let buf = canvas.read_rect(Rect::new(1, 0, 5, 3)).expect("in bounds");
        assert_eq!(buf.pixel(0, 0)[0], 10);
        assert_eq!(buf.pixel(1, 1)[0], 20);
        assert_eq!(buf.pixel(2, 1)[0], 20);
        assert_eq!(buf.pixel(3, 2)[0], 30);
    }

    #[test]
    fn out_of_bounds_rect_is_rejected() {
        let canvas = VirtualCanvas::new(vec![flat("a", 4, 4, 0)]).expect("valid sources");
        assert!(canvas.read_rect(Rect::new(0, 0, 5, 4)).is_err());
        assert!(canvas.read_rect(Rect::new(0, 0, 4, 5)).is_err());
        assert!(canvas.read_rect(Rect::new(4, 0, 4, 4)).is_err());
    }
}
