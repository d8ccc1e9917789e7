//! Area-average reduction between consecutive pyramid levels.
//!
//! Pure integer math: each child pixel is the per-channel mean of its 2x2
//! parent block (2x1, 1x2 or 1x1 at odd right/bottom edges), rounded half-up
//! with `(sum + count / 2) / count`. Reducing the same parent twice yields
//! identical bytes.

use crate::buffer::PixelBuffer;

/// Child dimensions for a parent: ceil-halved in both axes.
pub fn reduced_dims(width: u32, height: u32) -> (u32, u32) {
    (width.div_ceil(2), height.div_ceil(2))
}

/// Reduces a whole parent buffer into a freshly allocated child buffer.
pub fn reduce(parent: &PixelBuffer) -> PixelBuffer {
    let (w, h) = reduced_dims(parent.width(), parent.height());
    let mut child = PixelBuffer::new(w, h, parent.channels());
    reduce_into(parent, &mut child, 0);
    child
}

/// Reduces `src` into the horizontal span of `dst` starting at column
/// `dst_x`. Used to assemble a coarse level from canvas bands: `src` is the
/// band's pixels and `dst_x` its even-aligned global offset halved.
pub fn reduce_into(src: &PixelBuffer, dst: &mut PixelBuffer, dst_x: u32) {
    let ch = src.channels() as usize;
    let (out_w, out_h) = reduced_dims(src.width(), src.height());
    debug_assert_eq!(dst.channels(), src.channels());
    debug_assert!(dst_x + out_w <= dst.width());
    debug_assert!(out_h <= dst.height());

    for y in 0..out_h {
        let rows = [
            Some(src.row(2 * y)),
            (2 * y + 1 < src.height()).then(|| src.row(2 * y + 1)),
        ];
        let dst_row = dst.row_mut(y);
        for x in 0..out_w {
            let x_lo = 2 * x as usize * ch;
            let x_hi = (2 * x + 1 < src.width()).then_some(x_lo + ch);
            for c in 0..ch {
                let mut sum = 0u32;
                let mut count = 0u32;
                for row in rows.iter().flatten() {
                    sum += row[x_lo + c] as u32;
                    count += 1;
                    if let Some(hi) = x_hi {
                        sum += row[hi + c] as u32;
                        count += 1;
                    }
                }
                dst_row[(dst_x as usize + x as usize) * ch + c] =
                    ((sum + count / 2) / count) as u8;
            }
        }
    }
}
