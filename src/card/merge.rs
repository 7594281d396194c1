//! Region merger: directional morphological closing
//!
//! A wide horizontal closing bridges glyphs within a line, then a tall
//! vertical closing bridges lines within a paragraph. Pixels outside the
//! image never participate, so content touching the border is not eroded.

use crate::raster::{BinaryMask, MASK_BACKGROUND, MASK_FOREGROUND};
use image::GrayImage;

/// Axis of a line-shaped structuring element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Scaled structuring element length, never below the base length
pub fn scaled_length(base: u32, scale: f32) -> u32 {
    ((base as f32 * scale) as u32).max(base).max(1)
}

/// Directional closing pass pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionMerger {
    /// Length of the horizontal element (1 x n)
    pub horizontal: u32,
    /// Length of the vertical element (n x 1)
    pub vertical: u32,
}

impl RegionMerger {
    pub fn new(base_length: u32, scale: f32) -> Self {
        let length = scaled_length(base_length, scale);
        Self {
            horizontal: length,
            vertical: length,
        }
    }

    /// Horizontal closing followed by vertical closing
    pub fn merge(&self, mask: &BinaryMask) -> BinaryMask {
        let rows = close(mask, Axis::Horizontal, self.horizontal);
        close(&rows, Axis::Vertical, self.vertical)
    }
}

/// Dilate then erode with a line element of `length` along `axis`
pub fn close(mask: &BinaryMask, axis: Axis, length: u32) -> BinaryMask {
    let dilated = line_filter(mask, axis, length, Op::Dilate);
    line_filter(&dilated, axis, length, Op::Erode)
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Dilate,
    Erode,
}

fn line_filter(mask: &BinaryMask, axis: Axis, length: u32, op: Op) -> BinaryMask {
    let (width, height) = (mask.width(), mask.height());
    let src = mask.as_gray();
    let mut out = GrayImage::new(width, height);

    let (lines, span) = match axis {
        Axis::Horizontal => (height, width),
        Axis::Vertical => (width, height),
    };
    let anchor = (length / 2) as i64;
    let mut prefix = vec![0u32; span as usize + 1];

    for line in 0..lines {
        let at = |i: u32| match axis {
            Axis::Horizontal => (i, line),
            Axis::Vertical => (line, i),
        };

        for i in 0..span {
            let (x, y) = at(i);
            let fg = (src.get_pixel(x, y).0[0] == MASK_FOREGROUND) as u32;
            prefix[i as usize + 1] = prefix[i as usize] + fg;
        }

        for i in 0..span {
            let start = (i as i64 - anchor).max(0) as usize;
            let end = ((i as i64 - anchor + length as i64).min(span as i64)).max(0) as usize;
            let count = prefix[end] - prefix[start.min(end)];
            let window = end.saturating_sub(start) as u32;

            let on = match op {
                Op::Dilate => count > 0,
                Op::Erode => count == window,
            };
            let (x, y) = at(i);
            out.get_pixel_mut(x, y).0[0] = if on { MASK_FOREGROUND } else { MASK_BACKGROUND };
        }
    }

    BinaryMask::from_gray(out)
}
