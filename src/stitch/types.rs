//! Common types for the page stitching module

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::raster::RasterImage;

/// Whole-call stitching errors
#[derive(Debug, Error)]
pub enum StitchError {
    #[error("PDF not found: {0}")]
    PdfNotFound(PathBuf),

    #[error("Rasterizer unavailable: {0}")]
    RasterizerUnavailable(String),

    #[error("Rasterization failed: {0}")]
    RasterizeFailed(String),

    #[error("Failed to decode page {page}: {message}")]
    Decode { page: usize, message: String },

    #[error("Document produced no pages")]
    NoPages,

    #[error("Combined canvas is empty ({width}x{height})")]
    EmptyCanvas { width: u32, height: u32 },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Failed to save combined image: {0}")]
    SaveFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StitchError>;

/// Failure of a single page; never crosses the worker boundary
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("crop bounds are inverted (top {top} >= bottom {bottom})")]
    Degenerate { top: u32, bottom: u32 },

    #[error("page has no pixels")]
    EmptyPage,

    #[error("page worker panicked: {0}")]
    Panicked(String),
}

/// One rasterized page
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 0-based position in the document
    pub index: usize,
    pub image: RasterImage,
}

impl PageImage {
    pub fn new(index: usize, image: RasterImage) -> Self {
        Self { index, image }
    }
}

/// Rows `[top, bottom)` kept from a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrimBounds {
    pub top: u32,
    pub bottom: u32,
}

impl TrimBounds {
    pub fn full(height: u32) -> Self {
        Self {
            top: 0,
            bottom: height,
        }
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}

/// How a page's crop was decided
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum PageOutcome {
    /// Background rows removed
    Trimmed,
    /// Blank interior page reduced to zero rows
    Collapsed,
    /// Crop abandoned, page kept as is
    Kept(String),
    /// Processing failed, untrimmed original substituted
    Substituted(String),
}

/// A page after the trim stage
#[derive(Debug, Clone)]
pub struct TrimmedPage {
    pub index: usize,
    pub image: RasterImage,
    /// Rows of the source page that `image` holds
    pub bounds: TrimBounds,
    pub outcome: PageOutcome,
}

impl TrimmedPage {
    /// Untrimmed stand-in for a page whose processing failed
    pub fn substitute(page: &PageImage, error: &PageError) -> Self {
        Self {
            index: page.index,
            image: page.image.clone(),
            bounds: TrimBounds::full(page.image.height()),
            outcome: PageOutcome::Substituted(error.to_string()),
        }
    }
}

/// Per-page report of a stitch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    pub index: usize,
    pub bounds: TrimBounds,
    pub outcome: PageOutcome,
    /// Vertical offset in the combined canvas
    pub offset_y: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    #[test]
    fn test_trim_bounds_height() {
        assert_eq!(TrimBounds { top: 600, bottom: 800 }.height(), 200);
        assert_eq!(TrimBounds { top: 800, bottom: 600 }.height(), 0);
        assert_eq!(TrimBounds::full(1400).height(), 1400);
    }

    #[test]
    fn test_substitute_keeps_original() {
        let page = PageImage::new(3, RasterImage::new(DynamicImage::new_rgb8(10, 20), 1.0));
        let trimmed = TrimmedPage::substitute(&page, &PageError::EmptyPage);

        assert_eq!(trimmed.index, 3);
        assert_eq!(trimmed.bounds, TrimBounds::full(20));
        assert!(matches!(trimmed.outcome, PageOutcome::Substituted(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = StitchError::EmptyCanvas {
            width: 0,
            height: 10,
        };
        assert_eq!(err.to_string(), "Combined canvas is empty (0x10)");
    }
}
