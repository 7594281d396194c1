//! Page stitching module
//!
//! Turns a multi-page rasterized document into one vertically continuous
//! image: background rows between pages are trimmed in parallel, then the
//! pages are pasted in order onto a single canvas and written as PNG.
//!
//! # Example
//!
//! ```rust,no_run
//! use card_extract::stitch_pdf_pages;
//! use std::path::Path;
//!
//! if let Some(path) = stitch_pdf_pages(Path::new("doc.pdf"), Path::new("out"), 300) {
//!     println!("combined image: {}", path.display());
//! }
//! ```

pub mod compose;
pub mod parallel;
pub mod rasterize;
pub mod trim;
mod types;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use compose::{CanvasCompositor, CombinedImage, Placement};
pub use parallel::PagePipeline;
pub use rasterize::{PageRasterizer, PdftoppmRasterizer};
pub use trim::PageTrimmer;
pub use types::{
    PageError, PageImage, PageOutcome, PageSummary, Result, StitchError, TrimBounds, TrimmedPage,
};

use crate::progress::{NoopProgress, ProcessingStage, ProgressCallback};
use crate::raster::RasterImage;

// ============================================================
// Constants
// ============================================================

/// Default rasterization resolution
const DEFAULT_DPI: u32 = 300;

/// Lowest accepted rasterization resolution
const MIN_DPI: u32 = 18;

/// Highest accepted rasterization resolution
const MAX_DPI: u32 = 2400;

/// Suffix of the combined image file name
pub const COMBINED_SUFFIX: &str = "_combined.png";

// ============================================================
// Options
// ============================================================

/// Page stitching options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchOptions {
    /// Rasterization DPI
    pub dpi: u32,
    /// Worker threads for trimming (0 = number of CPUs)
    pub workers: usize,
    /// Mean row intensity above which a row is background
    pub white_threshold: f64,
    /// Center narrower pages horizontally
    pub center_pages: bool,
    /// Linear upscale applied to each page before trimming
    pub page_scale: f32,
}

impl Default for StitchOptions {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            workers: 0,
            white_threshold: trim::DEFAULT_WHITE_THRESHOLD,
            center_pages: true,
            page_scale: 1.0,
        }
    }
}

impl StitchOptions {
    /// Create a new options builder
    pub fn builder() -> StitchOptionsBuilder {
        StitchOptionsBuilder::default()
    }
}

/// Builder for StitchOptions
#[derive(Debug, Default)]
pub struct StitchOptionsBuilder {
    options: StitchOptions,
}

impl StitchOptionsBuilder {
    /// Set rasterization DPI
    #[must_use]
    pub fn dpi(mut self, dpi: u32) -> Self {
        let clamped = dpi.clamp(MIN_DPI, MAX_DPI);
        if clamped != dpi {
            tracing::warn!(
                requested = dpi,
                applied = clamped,
                "dpi outside {}..={}, clamped",
                MIN_DPI,
                MAX_DPI
            );
        }
        self.options.dpi = clamped;
        self
    }

    /// Set worker count (0 = number of CPUs)
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.options.workers = workers;
        self
    }

    /// Set white-row threshold (0-255)
    #[must_use]
    pub fn white_threshold(mut self, threshold: f64) -> Self {
        self.options.white_threshold = threshold.clamp(0.0, 255.0);
        self
    }

    /// Center or left-align narrower pages
    #[must_use]
    pub fn center_pages(mut self, center: bool) -> Self {
        self.options.center_pages = center;
        self
    }

    /// Set per-page upscale factor
    #[must_use]
    pub fn page_scale(mut self, scale: f32) -> Self {
        if scale.is_finite() && scale > 0.0 {
            self.options.page_scale = scale;
        }
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> StitchOptions {
        self.options
    }
}

// ============================================================
// Stitcher
// ============================================================

/// Combined canvas plus per-page report
#[derive(Debug, Clone)]
pub struct StitchResult {
    pub combined: CombinedImage,
    pub pages: Vec<PageSummary>,
}

/// Trim-and-composite driver
#[derive(Debug, Clone, Default)]
pub struct PageStitcher {
    options: StitchOptions,
}

impl PageStitcher {
    pub fn new(options: StitchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &StitchOptions {
        &self.options
    }

    /// Stitch in-memory page rasters given in page order
    pub fn stitch_images(
        &self,
        images: Vec<RasterImage>,
        progress: &dyn ProgressCallback,
    ) -> Result<StitchResult> {
        let pages: Vec<PageImage> = images
            .into_iter()
            .enumerate()
            .map(|(index, image)| PageImage::new(index, image))
            .collect();
        self.stitch_pages(&pages, progress)
    }

    /// Trim all pages in parallel, then composite them in index order
    pub fn stitch_pages(
        &self,
        pages: &[PageImage],
        progress: &dyn ProgressCallback,
    ) -> Result<StitchResult> {
        if pages.is_empty() {
            return Err(StitchError::NoPages);
        }

        let pipeline = PagePipeline::new(
            self.options.workers,
            PageTrimmer::new(self.options.white_threshold),
            self.options.page_scale,
        );
        let trimmed = pipeline.run(pages, progress)?;

        progress.on_stage(ProcessingStage::Compositing, trimmed.len());
        let compositor = CanvasCompositor::new(self.options.center_pages);
        let combined = compositor.compose(&trimmed)?;
        let summaries = compose::summarize(&trimmed, combined.placements());
        for page in &summaries {
            tracing::debug!(
                page = page.index,
                top = page.bounds.top,
                bottom = page.bounds.bottom,
                offset_y = page.offset_y,
                outcome = ?page.outcome,
                "page placed"
            );
        }
        progress.on_stage_complete(
            ProcessingStage::Compositing,
            &format!("{}x{}", combined.width(), combined.height()),
        );

        Ok(StitchResult {
            combined,
            pages: summaries,
        })
    }

    /// Rasterize `pdf_path`, stitch, and write `<stem>_combined.png` into
    /// `output_folder`
    pub fn stitch_pdf(
        &self,
        pdf_path: &Path,
        output_folder: &Path,
        rasterizer: &dyn PageRasterizer,
        progress: &dyn ProgressCallback,
    ) -> Result<PathBuf> {
        if !pdf_path.exists() {
            return Err(StitchError::PdfNotFound(pdf_path.to_path_buf()));
        }
        std::fs::create_dir_all(output_folder)?;

        progress.on_stage(ProcessingStage::Rasterizing, 0);
        let pages = rasterizer.rasterize(pdf_path, self.options.dpi)?;
        progress.on_stage_complete(
            ProcessingStage::Rasterizing,
            &format!("{} pages", pages.len()),
        );

        let result = self.stitch_pages(&pages, progress)?;

        progress.on_stage(ProcessingStage::Writing, 1);
        let output = combined_path(pdf_path, output_folder);
        result.combined.save(&output)?;
        progress.on_stage_complete(ProcessingStage::Writing, &output.display().to_string());
        tracing::info!(
            path = %output.display(),
            width = result.combined.width(),
            height = result.combined.height(),
            "combined image saved"
        );

        Ok(output)
    }
}

/// `<output_folder>/<pdf stem>_combined.png`
pub fn combined_path(pdf_path: &Path, output_folder: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    output_folder.join(format!("{}{}", stem, COMBINED_SUFFIX))
}

/// Rasterize a PDF with `pdftoppm` at `dpi` and stitch its pages.
///
/// Returns the combined image path, or `None` on any unrecoverable failure.
pub fn stitch_pdf_pages(pdf_path: &Path, output_folder: &Path, dpi: u32) -> Option<PathBuf> {
    let stitcher = PageStitcher::new(StitchOptions::builder().dpi(dpi).build());
    let result = PdftoppmRasterizer::locate().and_then(|rasterizer| {
        stitcher.stitch_pdf(pdf_path, output_folder, &rasterizer, &NoopProgress)
    });

    match result {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::error!(pdf = %pdf_path.display(), error = %e, "stitching failed");
            None
        }
    }
}
