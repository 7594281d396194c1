//! Page trimmer
//!
//! Removes background rows above and below a page's content. A row is
//! background when the mean of all its channel samples exceeds the white
//! threshold. The first page keeps its top margin and the last page keeps
//! its bottom margin so the stitched document still has outer margins.

use super::types::{PageError, PageImage, PageOutcome, TrimBounds, TrimmedPage};
use crate::raster::RasterImage;

/// Default white-row threshold (mean intensity, 0-255)
pub const DEFAULT_WHITE_THRESHOLD: f64 = 245.0;

/// Row-mean based trimmer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTrimmer {
    pub white_threshold: f64,
}

impl Default for PageTrimmer {
    fn default() -> Self {
        Self {
            white_threshold: DEFAULT_WHITE_THRESHOLD,
        }
    }
}

impl PageTrimmer {
    pub fn new(white_threshold: f64) -> Self {
        Self { white_threshold }
    }

    pub fn is_white_row(&self, image: &RasterImage, y: u32) -> bool {
        image.row_mean(y) > self.white_threshold
    }

    /// Raw scans: first non-white row from the top (height if none) and one
    /// past the last non-white row from the bottom (0 if none)
    pub fn scan(&self, image: &RasterImage) -> (u32, u32) {
        let height = image.height();
        let top = (0..height)
            .find(|&y| !self.is_white_row(image, y))
            .unwrap_or(height);
        let bottom = (0..height)
            .rev()
            .find(|&y| !self.is_white_row(image, y))
            .map_or(0, |y| y + 1);
        (top, bottom)
    }

    /// Crop bounds after the boundary-page exceptions
    pub fn bounds(
        &self,
        image: &RasterImage,
        index: usize,
        total: usize,
    ) -> std::result::Result<TrimBounds, PageError> {
        let (mut top, mut bottom) = self.scan(image);
        if index == 0 {
            top = 0;
        }
        if index + 1 == total {
            bottom = image.height();
        }

        if top >= bottom {
            return Err(PageError::Degenerate { top, bottom });
        }
        Ok(TrimBounds { top, bottom })
    }

    /// Trim one page. Degenerate bounds never fail the page: a blank interior
    /// page collapses to zero rows, anything else is kept whole.
    pub fn trim(&self, page: &PageImage, total: usize) -> TrimmedPage {
        let image = &page.image;
        let height = image.height();
        let interior = page.index != 0 && page.index + 1 != total;

        match self.bounds(image, page.index, total) {
            Ok(bounds) => {
                tracing::debug!(
                    page = page.index,
                    top = bounds.top,
                    bottom = bounds.bottom,
                    "page trimmed"
                );
                TrimmedPage {
                    index: page.index,
                    image: image.crop_rows(bounds.top, bounds.bottom),
                    bounds,
                    outcome: PageOutcome::Trimmed,
                }
            }
            Err(PageError::Degenerate { top, bottom })
                if interior && top == height && bottom == 0 =>
            {
                tracing::debug!(page = page.index, "blank interior page collapsed");
                TrimmedPage {
                    index: page.index,
                    image: image.crop_rows(0, 0),
                    bounds: TrimBounds { top: 0, bottom: 0 },
                    outcome: PageOutcome::Collapsed,
                }
            }
            Err(e) => {
                tracing::warn!(page = page.index, error = %e, "crop abandoned, keeping page");
                TrimmedPage {
                    index: page.index,
                    image: image.clone(),
                    bounds: TrimBounds::full(height),
                    outcome: PageOutcome::Kept(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma};

    fn page(index: usize, height: u32, dark_rows: std::ops::Range<u32>) -> PageImage {
        let img = GrayImage::from_fn(20, height, |_, y| {
            Luma([if dark_rows.contains(&y) { 0 } else { 255 }])
        });
        PageImage::new(index, RasterImage::new(DynamicImage::ImageLuma8(img), 1.0))
    }

    #[test]
    fn test_white_row_threshold_is_strict() {
        let img = GrayImage::from_pixel(4, 2, Luma([245]));
        let raster = RasterImage::new(DynamicImage::ImageLuma8(img), 1.0);
        assert!(!PageTrimmer::default().is_white_row(&raster, 0));
    }

    #[test]
    fn test_scan() {
        let p = page(1, 100, 30..60);
        assert_eq!(PageTrimmer::default().scan(&p.image), (30, 60));
    }

    #[test]
    fn test_interior_page_cropped_both_sides() {
        let trimmed = PageTrimmer::default().trim(&page(1, 100, 30..60), 3);
        assert_eq!(trimmed.bounds, TrimBounds { top: 30, bottom: 60 });
        assert_eq!(trimmed.image.height(), 30);
        assert_eq!(trimmed.outcome, PageOutcome::Trimmed);
    }

    #[test]
    fn test_first_page_keeps_top_margin() {
        let trimmed = PageTrimmer::default().trim(&page(0, 100, 30..60), 3);
        assert_eq!(trimmed.bounds, TrimBounds { top: 0, bottom: 60 });
    }

    #[test]
    fn test_last_page_keeps_bottom_margin() {
        let trimmed = PageTrimmer::default().trim(&page(2, 100, 30..60), 3);
        assert_eq!(trimmed.bounds, TrimBounds { top: 30, bottom: 100 });
    }

    #[test]
    fn test_single_page_is_untouched() {
        let trimmed = PageTrimmer::default().trim(&page(0, 100, 30..60), 1);
        assert_eq!(trimmed.bounds, TrimBounds::full(100));
        assert_eq!(trimmed.outcome, PageOutcome::Trimmed);
    }

    #[test]
    fn test_blank_interior_page_collapses() {
        let trimmed = PageTrimmer::default().trim(&page(1, 100, 0..0), 3);
        assert_eq!(trimmed.outcome, PageOutcome::Collapsed);
        assert_eq!(trimmed.image.height(), 0);
    }

    #[test]
    fn test_blank_boundary_pages_keep_margin() {
        let trimmer = PageTrimmer::default();

        let first = trimmer.trim(&page(0, 100, 0..0), 3);
        assert!(matches!(first.outcome, PageOutcome::Kept(_)));
        assert_eq!(first.image.height(), 100);

        let last = trimmer.trim(&page(2, 100, 0..0), 3);
        assert!(matches!(last.outcome, PageOutcome::Kept(_)));
        assert_eq!(last.image.height(), 100);
    }

    #[test]
    fn test_degenerate_bounds_error() {
        let p = page(1, 50, 0..0);
        assert_eq!(
            PageTrimmer::default().bounds(&p.image, 1, 3),
            Err(PageError::Degenerate { top: 50, bottom: 0 })
        );
    }
}
