//! Raster primitives shared by the card extractor and the page stitcher
//!
//! Every stage consumes an immutable [`RasterImage`] or [`BinaryMask`] and
//! produces a new one. Pixel buffers are normalized to 1, 3 or 4 channels of
//! 8-bit samples on construction.

use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ============================================================
// Constants
// ============================================================

/// Foreground value in a binary mask
pub const MASK_FOREGROUND: u8 = 255;

/// Background value in a binary mask
pub const MASK_BACKGROUND: u8 = 0;

// ============================================================
// Channel mode
// ============================================================

/// Channel layout of a raster image.
///
/// Variants are ordered by compositing precedence: `Rgba > Rgb > Gray`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    /// Single luminance channel
    #[default]
    Gray,
    /// Three color channels
    Rgb,
    /// Three color channels plus alpha
    Rgba,
}

impl ChannelMode {
    /// Number of 8-bit channels per pixel
    pub fn channel_count(self) -> u8 {
        match self {
            ChannelMode::Gray => 1,
            ChannelMode::Rgb => 3,
            ChannelMode::Rgba => 4,
        }
    }

    /// Resolve the mode of a canvas holding images of the given modes
    pub fn resolve<I: IntoIterator<Item = ChannelMode>>(modes: I) -> ChannelMode {
        modes.into_iter().max().unwrap_or_default()
    }

    /// Convert an image to this channel mode
    pub fn convert(self, image: &DynamicImage) -> DynamicImage {
        match self {
            ChannelMode::Gray => DynamicImage::ImageLuma8(image.to_luma8()),
            ChannelMode::Rgb => DynamicImage::ImageRgb8(image.to_rgb8()),
            ChannelMode::Rgba => DynamicImage::ImageRgba8(image.to_rgba8()),
        }
    }

    fn of(image: &DynamicImage) -> ChannelMode {
        let color = image.color();
        if color.has_alpha() {
            ChannelMode::Rgba
        } else if color.has_color() {
            ChannelMode::Rgb
        } else {
            ChannelMode::Gray
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelMode::Gray => "gray",
            ChannelMode::Rgb => "rgb",
            ChannelMode::Rgba => "rgba",
        };
        f.write_str(name)
    }
}

// ============================================================
// Bounding box
// ============================================================

/// Axis-aligned rectangle in pixel coordinates (right/bottom exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from exclusive edge coordinates
    pub fn from_edges(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            x: left,
            y: top,
            width: right.saturating_sub(left),
            height: bottom.saturating_sub(top),
        }
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Smallest rectangle containing both boxes
    #[must_use]
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::from_edges(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Whether `other` lies entirely inside this box
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Whether the two boxes share at least one pixel
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Union over a sequence of boxes, `None` when the sequence is empty
    pub fn union_all<'a, I: IntoIterator<Item = &'a BoundingBox>>(boxes: I) -> Option<BoundingBox> {
        boxes
            .into_iter()
            .fold(None, |acc: Option<BoundingBox>, b| {
                Some(acc.map_or(*b, |a| a.union(b)))
            })
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

// ============================================================
// Raster image
// ============================================================

/// Owned 8-bit raster with its resolution scale relative to the nominal baseline
#[derive(Debug, Clone)]
pub struct RasterImage {
    image: DynamicImage,
    scale: f32,
}

impl RasterImage {
    /// Wrap a decoded image, normalizing it to Gray, Rgb or Rgba 8-bit
    pub fn new(image: DynamicImage, scale: f32) -> Self {
        let mode = ChannelMode::of(&image);
        let normalized = matches!(
            (&image, mode),
            (DynamicImage::ImageLuma8(_), ChannelMode::Gray)
                | (DynamicImage::ImageRgb8(_), ChannelMode::Rgb)
                | (DynamicImage::ImageRgba8(_), ChannelMode::Rgba)
        );
        let image = if normalized {
            image
        } else {
            mode.convert(&image)
        };
        Self {
            image,
            scale: if scale.is_finite() && scale > 0.0 { scale } else { 1.0 },
        }
    }

    /// Decode an image file
    pub fn open(path: &Path, scale: f32) -> image::ImageResult<Self> {
        Ok(Self::new(image::open(path)?, scale))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn channel_mode(&self) -> ChannelMode {
        ChannelMode::of(&self.image)
    }

    pub fn channels(&self) -> u8 {
        self.channel_mode().channel_count()
    }

    /// Resolution scale factor relative to the nominal baseline
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn to_luma8(&self) -> GrayImage {
        self.image.to_luma8()
    }

    /// Copy out a region; the box is clipped to the image extent
    pub fn crop(&self, region: &BoundingBox) -> RasterImage {
        let x = region.x.min(self.width());
        let y = region.y.min(self.height());
        let w = region.width.min(self.width() - x);
        let h = region.height.min(self.height() - y);
        RasterImage {
            image: self.image.crop_imm(x, y, w, h),
            scale: self.scale,
        }
    }

    /// Copy out full-width rows `[top, bottom)`
    pub fn crop_rows(&self, top: u32, bottom: u32) -> RasterImage {
        let bottom = bottom.min(self.height());
        let top = top.min(bottom);
        self.crop(&BoundingBox::from_edges(0, top, self.width(), bottom))
    }

    /// Linear (triangle filter) resize by an integer-friendly factor
    pub fn resize_linear(&self, factor: f32) -> RasterImage {
        let width = ((self.width() as f32 * factor).round() as u32).max(1);
        let height = ((self.height() as f32 * factor).round() as u32).max(1);
        RasterImage {
            image: self
                .image
                .resize_exact(width, height, image::imageops::FilterType::Triangle),
            scale: self.scale * factor,
        }
    }

    /// Mean of all channel samples in row `y`
    pub fn row_mean(&self, y: u32) -> f64 {
        let channels = self.channels() as usize;
        let row_len = self.width() as usize * channels;
        if row_len == 0 {
            return 0.0;
        }
        let bytes = self.image.as_bytes();
        let start = y as usize * row_len;
        let sum: u64 = bytes[start..start + row_len].iter().map(|&v| v as u64).sum();
        sum as f64 / row_len as f64
    }
}

// ============================================================
// Binary mask
// ============================================================

/// Single-channel mask whose pixels are either 0 or 255
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    pixels: GrayImage,
}

impl BinaryMask {
    /// All-background mask
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: GrayImage::new(width, height),
        }
    }

    /// Build a mask from a grayscale image, any nonzero pixel is foreground
    pub fn from_gray(gray: GrayImage) -> Self {
        let mut pixels = gray;
        for p in pixels.pixels_mut() {
            p.0[0] = if p.0[0] > 0 {
                MASK_FOREGROUND
            } else {
                MASK_BACKGROUND
            };
        }
        Self { pixels }
    }

    /// Build a mask from a per-pixel predicate
    pub fn from_fn<F: FnMut(u32, u32) -> bool>(width: u32, height: u32, mut f: F) -> Self {
        Self {
            pixels: GrayImage::from_fn(width, height, |x, y| {
                Luma([if f(x, y) {
                    MASK_FOREGROUND
                } else {
                    MASK_BACKGROUND
                }])
            }),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.pixels.get_pixel(x, y).0[0] == MASK_FOREGROUND
    }

    pub fn foreground_count(&self) -> usize {
        self.pixels
            .as_raw()
            .iter()
            .filter(|&&v| v == MASK_FOREGROUND)
            .count()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_channel_mode_precedence() {
        assert_eq!(
            ChannelMode::resolve([ChannelMode::Gray, ChannelMode::Rgb]),
            ChannelMode::Rgb
        );
        assert_eq!(
            ChannelMode::resolve([ChannelMode::Rgb, ChannelMode::Rgba, ChannelMode::Gray]),
            ChannelMode::Rgba
        );
        assert_eq!(ChannelMode::resolve([]), ChannelMode::Gray);
    }

    #[test]
    fn test_bounding_box_union() {
        let a = BoundingBox::new(10, 10, 20, 20);
        let b = BoundingBox::new(100, 5, 10, 10);
        let u = a.union(&b);

        assert_eq!(u, BoundingBox::from_edges(10, 5, 110, 30));
        assert!(u.contains(&a));
        assert!(u.contains(&b));
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_union_all_empty() {
        assert!(BoundingBox::union_all(&[]).is_none());
    }

    #[test]
    fn test_raster_normalizes_luma_alpha() {
        let img = DynamicImage::ImageLumaA8(image::GrayAlphaImage::new(4, 4));
        let raster = RasterImage::new(img, 1.0);
        assert_eq!(raster.channels(), 4);
    }

    #[test]
    fn test_raster_rejects_bad_scale() {
        let raster = RasterImage::new(DynamicImage::new_luma8(2, 2), f32::NAN);
        assert_eq!(raster.scale(), 1.0);
    }

    #[test]
    fn test_row_mean() {
        let mut img = RgbImage::from_pixel(4, 2, Rgb([255, 255, 255]));
        img.put_pixel(0, 1, Rgb([0, 0, 0]));
        let raster = RasterImage::new(DynamicImage::ImageRgb8(img), 1.0);

        assert_eq!(raster.row_mean(0), 255.0);
        assert!((raster.row_mean(1) - 191.25).abs() < 1e-9);
    }

    #[test]
    fn test_row_mean_includes_alpha() {
        let img = RgbaImage::from_pixel(2, 1, Rgba([255, 255, 255, 0]));
        let raster = RasterImage::new(DynamicImage::ImageRgba8(img), 1.0);
        assert!((raster.row_mean(0) - 191.25).abs() < 1e-9);
    }

    #[test]
    fn test_crop_clips_to_bounds() {
        let raster = RasterImage::new(DynamicImage::new_rgb8(50, 40), 1.0);
        let cropped = raster.crop(&BoundingBox::new(40, 30, 100, 100));
        assert_eq!(cropped.dimensions(), (10, 10));
    }

    #[test]
    fn test_binary_mask_from_gray() {
        let mut gray = GrayImage::new(3, 1);
        gray.put_pixel(1, 0, Luma([7]));
        let mask = BinaryMask::from_gray(gray);

        assert!(!mask.is_foreground(0, 0));
        assert!(mask.is_foreground(1, 0));
        assert_eq!(mask.foreground_count(), 1);
    }
}
