//! Pyramid planning - level geometry and per-level tile grids.

use crate::buffer::Rect;

/// One resolution step of the pyramid.
///
/// DeepZoom numbering: level N holds max(width, height) <= 2^N, so the finest
/// level has the highest index and the terminal level (max dimension <= 1) is
/// level 0. Consecutive levels differ by ceil-halving in each dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidLevel {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
}

impl PyramidLevel {
    pub fn columns(&self) -> u32 {
        self.width.div_ceil(self.tile_size)
    }

    pub fn rows(&self) -> u32 {
        self.height.div_ceil(self.tile_size)
    }

    pub fn tile_count(&self) -> u64 {
        self.columns() as u64 * self.rows() as u64
    }

    /// The rectangle of level pixels covered by tile (col, row), with the
    /// overlap border added on each side and clamped to the level bounds.
    /// None if the coordinate is outside the tile grid.
    pub fn tile_rect(&self, col: u32, row: u32, overlap: u32) -> Option<Rect> {
        if col >= self.columns() || row >= self.rows() {
            return None;
        }
        let x0 = (col * self.tile_size).saturating_sub(overlap);
        let y0 = (row * self.tile_size).saturating_sub(overlap);
        let x1 = ((col + 1) * self.tile_size + overlap).min(self.width);
        let y1 = ((row + 1) * self.tile_size + overlap).min(self.height);
        Some(Rect::new(x0, y0, x1, y1))
    }

    /// Pixel size of tile (col, row) without overlap; edge tiles are smaller.
    pub fn tile_dimensions(&self, col: u32, row: u32) -> Option<(u32, u32)> {
        let rect = self.tile_rect(col, row, 0)?;
        Some((rect.width(), rect.height()))
    }
}

/// The computed level chain, ordered finest-first.
#[derive(Debug, Clone)]
pub struct Pyramid {
    levels: Vec<PyramidLevel>,
}

impl Pyramid {
    pub fn levels(&self) -> &[PyramidLevel] {
        &self.levels
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn finest(&self) -> &PyramidLevel {
        &self.levels[0]
    }

    pub fn terminal(&self) -> &PyramidLevel {
        &self.levels[self.levels.len() - 1]
    }
}

/// Plans the level chain for a canvas: the finest level matches the canvas
/// exactly, each next level ceil-halves both dimensions, and planning stops
/// once max(width, height) <= 1. The resulting level count equals
/// ceil(log2(max(width, height))) + 1.
pub fn plan(width: u32, height: u32, tile_size: u32) -> Pyramid {
    assert!(width > 0 && height > 0, "canvas dimensions must be positive");
    assert!(tile_size > 0, "tile size must be positive");

    let mut dims = vec![(width, height)];
    let (mut w, mut h) = (width, height);
    while w.max(h) > 1 {
        w = w.div_ceil(2);
        h = h.div_ceil(2);
        dims.push((w, h));
    }
    let count = dims.len() as u32;
    let levels = dims
        .into_iter()
        .enumerate()
        .map(|(i, (width, height))| PyramidLevel {
            index: count - 1 - i as u32,
            width,
            height,
            tile_size,
        })
        .collect();
    Pyramid { levels }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panorama_300x50_has_ten_levels() {
        let pyramid = plan(300, 50, 256);
        assert_eq!(pyramid.level_count(), 10);
        assert_eq!(pyramid.finest().index, 9);
        assert_eq!((pyramid.finest().width, pyramid.finest().height), (300, 50));
        let terminal = pyramid.terminal();
        assert_eq!(terminal.index, 0);
        assert!(terminal.width.max(terminal.height) <= 1);
    }

    #[test]
    fn ceil_halving_chain_from_10x10() {
        let pyramid = plan(10, 10, 256);
        let dims: Vec<(u32, u32)> =
            pyramid.levels().iter().map(|l| (l.width, l.height)).collect();
        assert_eq!(dims, vec![(10, 10), (5, 5), (3, 3), (2, 2), (1, 1)]);
    }

    #[test]
    fn level_count_matches_log2_formula() {
        for (w, h) in [(1, 1), (2, 1), (256, 256), (257, 100), (300, 50), (1023, 1)] {
            let max = w.max(h) as f64;
            let expected = max.log2().ceil() as usize + 1;
            assert_eq!(plan(w, h, 256).level_count(), expected, "for {w}x{h}");
        }
    }

    #[test]
    fn single_pixel_canvas_is_one_level() {
        let pyramid = plan(1, 1, 256);
        assert_eq!(pyramid.level_count(), 1);
        assert_eq!(pyramid.finest().index, 0);
    }

    #[test]
    fn finest_tile_grid_counts() {
        let level = plan(300, 50, 256).levels()[0];
        assert_eq!(level.columns(), 2);
        assert_eq!(level.rows(), 1);
        assert_eq!(level.tile_count(), 2);

        let level = plan(1000, 700, 256).levels()[0];
        assert_eq!(level.columns(), 4);
        assert_eq!(level.rows(), 3);
    }

    #[test]
    fn edge_tile_dimensions_are_cropped() {
        let level = plan(1000, 700, 256).levels()[0];
        assert_eq!(level.tile_dimensions(0, 0), Some((256, 256)));
        assert_eq!(level.tile_dimensions(3, 0), Some((232, 256)));
        assert_eq!(level.tile_dimensions(0, 2), Some((256, 188)));
        assert_eq!(level.tile_dimensions(3, 2), Some((232, 188)));
        assert_eq!(level.tile_dimensions(4, 0), None);
        assert_eq!(level.tile_dimensions(0, 3), None);
    }

    #[test]
    fn divisible_dimensions_keep_full_tiles() {
        let level = plan(512, 256, 256).levels()[0];
        assert_eq!(level.tile_dimensions(1, 0), Some((256, 256)));
    }

    #[test]
    fn overlap_expands_and_clamps_tile_rects() {
        let level = plan(300, 50, 256).levels()[0];
        // Interior-left tile: no room on the left, one pixel into the right neighbor.
        assert_eq!(level.tile_rect(0, 0, 1), Some(Rect::new(0, 0, 257, 50)));
        // Right edge tile: one pixel back into the left neighbor, clamped right.
        assert_eq!(level.tile_rect(1, 0, 1), Some(Rect::new(255, 0, 300, 50)));
    }
}
