//! Canvas compositor
//!
//! Pastes trimmed pages top to bottom onto a white canvas whose width is
//! the widest page and whose height is the sum of page heights. The canvas
//! channel mode is the highest of the pages' modes (`Rgba > Rgb > Gray`).

use image::imageops;
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Pixel, Rgb, Rgba};
use std::path::Path;

use super::types::{PageSummary, Result, StitchError, TrimmedPage};
use crate::raster::{BoundingBox, ChannelMode};

/// Placement of one page on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub index: usize,
    pub rect: BoundingBox,
}

/// The stitched canvas
#[derive(Debug, Clone)]
pub struct CombinedImage {
    image: DynamicImage,
    mode: ChannelMode,
    placements: Vec<Placement>,
}

impl CombinedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Write as PNG regardless of the path's extension
    pub fn save(&self, path: &Path) -> Result<()> {
        self.image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| StitchError::SaveFailed(e.to_string()))
    }
}

/// Canvas size and mode for a set of pages
pub fn layout(pages: &[TrimmedPage]) -> (u32, u32, ChannelMode) {
    let width = pages.iter().map(|p| p.image.width()).max().unwrap_or(0);
    let height = pages.iter().map(|p| p.image.height()).sum();
    let mode = ChannelMode::resolve(pages.iter().map(|p| p.image.channel_mode()));
    (width, height, mode)
}

/// Sequential page compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasCompositor {
    /// Center narrower pages horizontally instead of left-aligning them
    pub center: bool,
}

impl Default for CanvasCompositor {
    fn default() -> Self {
        Self { center: true }
    }
}

impl CanvasCompositor {
    pub fn new(center: bool) -> Self {
        Self { center }
    }

    /// Compute where every page goes, in page order
    pub fn placements(&self, pages: &[TrimmedPage]) -> Vec<Placement> {
        let (width, _, _) = layout(pages);
        let mut offset_y = 0u32;

        pages
            .iter()
            .map(|page| {
                let (w, h) = page.image.dimensions();
                let x = if self.center { (width - w) / 2 } else { 0 };
                let placement = Placement {
                    index: page.index,
                    rect: BoundingBox::new(x, offset_y, w, h),
                };
                offset_y += h;
                placement
            })
            .collect()
    }

    /// Paste all pages onto a new canvas
    pub fn compose(&self, pages: &[TrimmedPage]) -> Result<CombinedImage> {
        let (width, height, mode) = layout(pages);
        if width == 0 || height == 0 {
            return Err(StitchError::EmptyCanvas { width, height });
        }

        let placements = self.placements(pages);
        let sources: Vec<(&DynamicImage, &Placement)> =
            pages.iter().map(|p| p.image.as_dynamic()).zip(&placements).collect();

        let image = match mode {
            ChannelMode::Gray => DynamicImage::ImageLuma8(paste(
                width,
                height,
                Luma([255]),
                &sources,
                DynamicImage::to_luma8,
            )),
            ChannelMode::Rgb => DynamicImage::ImageRgb8(paste(
                width,
                height,
                Rgb([255, 255, 255]),
                &sources,
                DynamicImage::to_rgb8,
            )),
            ChannelMode::Rgba => DynamicImage::ImageRgba8(paste(
                width,
                height,
                Rgba([255, 255, 255, 255]),
                &sources,
                DynamicImage::to_rgba8,
            )),
        };

        tracing::info!(width, height, %mode, pages = pages.len(), "pages composited");
        Ok(CombinedImage {
            image,
            mode,
            placements,
        })
    }
}

/// Copy (not blend) every page into a white buffer of pixel type `P`
fn paste<P, F>(
    width: u32,
    height: u32,
    background: P,
    sources: &[(&DynamicImage, &Placement)],
    convert: F,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
    F: Fn(&DynamicImage) -> ImageBuffer<P, Vec<u8>>,
{
    let mut canvas = ImageBuffer::from_pixel(width, height, background);
    for (image, placement) in sources {
        if placement.rect.is_empty() {
            continue;
        }
        let page = convert(image);
        imageops::replace(
            &mut canvas,
            &page,
            placement.rect.x as i64,
            placement.rect.y as i64,
        );
    }
    canvas
}

/// Per-page report joining trim results with canvas offsets
pub fn summarize(pages: &[TrimmedPage], placements: &[Placement]) -> Vec<PageSummary> {
    pages
        .iter()
        .zip(placements)
        .map(|(page, placement)| PageSummary {
            index: page.index,
            bounds: page.bounds,
            outcome: page.outcome.clone(),
            offset_y: placement.rect.y,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::RasterImage;
    use crate::stitch::types::{PageOutcome, TrimBounds};
    use image::{GrayImage, RgbImage, RgbaImage};

    fn trimmed(index: usize, image: DynamicImage) -> TrimmedPage {
        let height = image.height();
        TrimmedPage {
            index,
            image: RasterImage::new(image, 1.0),
            bounds: TrimBounds::full(height),
            outcome: PageOutcome::Trimmed,
        }
    }

    #[test]
    fn test_layout_and_mode() {
        let pages = vec![
            trimmed(0, DynamicImage::ImageLuma8(GrayImage::new(10, 5))),
            trimmed(1, DynamicImage::ImageRgb8(RgbImage::new(20, 7))),
        ];
        assert_eq!(layout(&pages), (20, 12, ChannelMode::Rgb));
    }

    #[test]
    fn test_rgba_wins() {
        let pages = vec![
            trimmed(0, DynamicImage::ImageRgb8(RgbImage::new(4, 4))),
            trimmed(1, DynamicImage::ImageRgba8(RgbaImage::new(4, 4))),
            trimmed(2, DynamicImage::ImageLuma8(GrayImage::new(4, 4))),
        ];
        let combined = CanvasCompositor::default().compose(&pages).unwrap();
        assert_eq!(combined.mode(), ChannelMode::Rgba);
        assert!(matches!(combined.as_dynamic(), DynamicImage::ImageRgba8(_)));
    }

    #[test]
    fn test_narrow_page_centered_on_white() {
        let pages = vec![
            trimmed(0, DynamicImage::ImageLuma8(GrayImage::new(10, 2))),
            trimmed(1, DynamicImage::ImageLuma8(GrayImage::new(4, 2))),
        ];
        let combined = CanvasCompositor::new(true).compose(&pages).unwrap();
        let gray = combined.as_dynamic().to_luma8();

        assert_eq!(combined.placements()[1].rect, BoundingBox::new(3, 2, 4, 2));
        assert_eq!(gray.get_pixel(2, 3).0[0], 255);
        assert_eq!(gray.get_pixel(3, 3).0[0], 0);
        assert_eq!(gray.get_pixel(7, 3).0[0], 255);
    }

    #[test]
    fn test_left_aligned() {
        let pages = vec![
            trimmed(0, DynamicImage::ImageLuma8(GrayImage::new(10, 2))),
            trimmed(1, DynamicImage::ImageLuma8(GrayImage::new(4, 2))),
        ];
        let placements = CanvasCompositor::new(false).placements(&pages);
        assert_eq!(placements[1].rect.x, 0);
    }

    #[test]
    fn test_transparent_pixels_are_copied_not_blended() {
        let pages = vec![trimmed(
            0,
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]))),
        )];
        let combined = CanvasCompositor::default().compose(&pages).unwrap();
        let rgba = combined.as_dynamic().to_rgba8();
        assert_eq!(*rgba.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_empty_canvas_is_error() {
        let pages = vec![trimmed(0, DynamicImage::ImageLuma8(GrayImage::new(10, 0)))];
        assert!(matches!(
            CanvasCompositor::default().compose(&pages),
            Err(StitchError::EmptyCanvas { width: 10, height: 0 })
        ));
        assert!(matches!(
            CanvasCompositor::default().compose(&[]),
            Err(StitchError::EmptyCanvas { .. })
        ));
    }
}
