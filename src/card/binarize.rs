//! Binarizer: grayscale, blur and adaptive threshold
//!
//! Foreground pixels are those darker than the mean of their local window by
//! at least a fixed offset. Kernel and window sizes grow linearly with the
//! image's resolution scale so detection is resolution-invariant.

use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;
use imageproc::integral_image::{integral_image, sum_image_pixels};

use crate::raster::{BinaryMask, RasterImage};

/// Round `base * scale` down, clamp to `base`, then bump to the next odd value
pub fn scaled_odd(base: u32, scale: f32) -> u32 {
    let size = ((base as f32 * scale) as u32).max(base);
    if size % 2 == 0 {
        size + 1
    } else {
        size
    }
}

/// Sigma of a Gaussian kernel of the given odd size
fn sigma_for_kernel(size: u32) -> f32 {
    0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Adaptive-threshold binarizer sized for one resolution scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binarizer {
    /// Blur kernel size (odd, >= 3)
    pub blur_kernel: u32,
    /// Threshold window size (odd)
    pub block_size: u32,
    /// Required darkness below the local mean
    pub offset: i32,
}

impl Binarizer {
    pub fn new(base_blur: u32, base_block: u32, offset: i32, scale: f32) -> Self {
        Self {
            blur_kernel: scaled_odd(base_blur.max(3), scale),
            block_size: scaled_odd(base_block.max(3), scale),
            offset,
        }
    }

    /// Convert to luminance and blur
    pub fn smooth(&self, image: &RasterImage) -> GrayImage {
        let gray = image.to_luma8();
        gaussian_blur_f32(&gray, sigma_for_kernel(self.blur_kernel))
    }

    /// Produce the foreground mask of an image
    pub fn binarize(&self, image: &RasterImage) -> BinaryMask {
        let blurred = self.smooth(image);
        adaptive_threshold(&blurred, self.block_size / 2, self.offset)
    }
}

/// Mark pixels at or below `local_mean - offset` as foreground.
///
/// The window is `(2 * radius + 1)` square, clipped at the image border.
pub fn adaptive_threshold(gray: &GrayImage, radius: u32, offset: i32) -> BinaryMask {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return BinaryMask::new(width, height);
    }
    let integral = integral_image::<_, u64>(gray);

    BinaryMask::from_fn(width, height, |x, y| {
        let left = x.saturating_sub(radius);
        let top = y.saturating_sub(radius);
        let right = (x + radius).min(width - 1);
        let bottom = (y + radius).min(height - 1);

        let count = ((right - left + 1) * (bottom - top + 1)) as i64;
        let sum = sum_image_pixels(&integral, left, top, right, bottom)[0] as i64;
        let value = gray.get_pixel(x, y).0[0] as i64;

        (value + offset as i64) * count <= sum
    })
}
