//! Card extraction module
//!
//! Locates the smallest rectangle enclosing all meaningful content in a
//! rendered screenshot and crops it out of the original pixels.
//!
//! # Algorithm
//!
//! 1. Grayscale, Gaussian blur and adaptive threshold ([`binarize`])
//! 2. Horizontal then vertical closing to merge glyphs into blocks ([`merge`])
//! 3. External contours filtered by a resolution-scaled area ([`contours`])
//! 4. Largest contour as anchor, union of all survivors as content box
//! 5. Proportional padding, clipped to the image bounds
//!
//! When step 3 leaves nothing, the [`fallback`] ladder tries a blob detector
//! and a global threshold detector before returning the source upscaled 3x.
//!
//! # Example
//!
//! ```rust,no_run
//! use card_extract::{CardExtractor, CardOptions};
//! use std::path::Path;
//!
//! let options = CardOptions::builder().min_area(500).build();
//! let outcome = CardExtractor::new(options)
//!     .extract_file(Path::new("shot.png"), Path::new("card.png"), false)
//!     .unwrap();
//!
//! println!("found: {}", outcome.is_found());
//! ```

pub mod binarize;
pub mod contours;
pub mod debug;
pub mod fallback;
pub mod merge;
mod types;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use debug::DebugArtifacts;
pub use fallback::Detection;
pub use types::{CardError, CardRegion, Detector, ExtractionOutcome, Result};

use crate::progress::{NoopProgress, ProcessingStage, ProgressCallback};
use crate::raster::{BoundingBox, RasterImage};

// ============================================================
// Constants
// ============================================================

/// Default minimum content area in pixels at baseline resolution
const DEFAULT_MIN_AREA: u32 = 500;

/// Default resolution of screenshots relative to the baseline
const DEFAULT_SCALE_FACTOR: f32 = 2.0;

/// Default padding on each side, percent of the source dimension
const DEFAULT_PADDING_PERCENT: f32 = 1.5;

/// Darkness below the local mean required for foreground
const DEFAULT_ADAPTIVE_OFFSET: i32 = 2;

/// Blur kernel at baseline resolution
const DEFAULT_BLUR_KERNEL: u32 = 3;

/// Adaptive threshold window at baseline resolution
const DEFAULT_BLOCK_SIZE: u32 = 11;

/// Closing element length at baseline resolution
const DEFAULT_MERGE_LENGTH: u32 = 15;

/// Square closing size of the global threshold fallback
const DEFAULT_GLOBAL_CLOSE_SIZE: u32 = 5;

/// Linear factor of the terminal fallback
const DEFAULT_UPSCALE_FACTOR: u32 = 3;

/// Upper bound of the padding percentage
const MAX_PADDING_PERCENT: f32 = 50.0;

// ============================================================
// Options
// ============================================================

/// Card extraction options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardOptions {
    /// Minimum content area in pixels, at baseline resolution
    pub min_area: u32,
    /// Resolution of the input relative to the baseline
    pub scale_factor: f32,
    /// Padding per side as percent of width/height
    pub padding_percent: f32,
    /// Adaptive threshold offset
    pub adaptive_offset: i32,
    /// Blur kernel size at baseline resolution
    pub base_blur_kernel: u32,
    /// Adaptive window size at baseline resolution
    pub base_block_size: u32,
    /// Closing element length at baseline resolution
    pub base_merge_length: u32,
    /// Closing size used by the global threshold detector
    pub global_close_size: u32,
    /// Upscale factor used when nothing is found
    pub upscale_factor: u32,
}

impl Default for CardOptions {
    fn default() -> Self {
        Self {
            min_area: DEFAULT_MIN_AREA,
            scale_factor: DEFAULT_SCALE_FACTOR,
            padding_percent: DEFAULT_PADDING_PERCENT,
            adaptive_offset: DEFAULT_ADAPTIVE_OFFSET,
            base_blur_kernel: DEFAULT_BLUR_KERNEL,
            base_block_size: DEFAULT_BLOCK_SIZE,
            base_merge_length: DEFAULT_MERGE_LENGTH,
            global_close_size: DEFAULT_GLOBAL_CLOSE_SIZE,
            upscale_factor: DEFAULT_UPSCALE_FACTOR,
        }
    }
}

impl CardOptions {
    /// Create a new options builder
    pub fn builder() -> CardOptionsBuilder {
        CardOptionsBuilder::default()
    }
}

/// Builder for CardOptions
#[derive(Debug, Default)]
pub struct CardOptionsBuilder {
    options: CardOptions,
}

impl CardOptionsBuilder {
    /// Set minimum content area (baseline pixels)
    #[must_use]
    pub fn min_area(mut self, area: u32) -> Self {
        self.options.min_area = area;
        self
    }

    /// Set resolution scale factor
    #[must_use]
    pub fn scale_factor(mut self, scale: f32) -> Self {
        if scale.is_finite() && scale > 0.0 {
            self.options.scale_factor = scale;
        }
        self
    }

    /// Set padding percentage
    #[must_use]
    pub fn padding_percent(mut self, percent: f32) -> Self {
        self.options.padding_percent = percent.clamp(0.0, MAX_PADDING_PERCENT);
        self
    }

    /// Set adaptive threshold offset
    #[must_use]
    pub fn adaptive_offset(mut self, offset: i32) -> Self {
        self.options.adaptive_offset = offset;
        self
    }

    /// Set terminal fallback upscale factor
    #[must_use]
    pub fn upscale_factor(mut self, factor: u32) -> Self {
        self.options.upscale_factor = factor.max(1);
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> CardOptions {
        self.options
    }
}

// ============================================================
// Padding & clipping
// ============================================================

/// Expand a content box by a percentage of the source size, clipped to it
pub fn pad_and_clip(content: &BoundingBox, source: (u32, u32), percent: f32) -> CardRegion {
    let (width, height) = source;
    let percent = percent.max(0.0) as f64;
    let pad_h = (width as f64 * percent / 100.0) as u32;
    let pad_v = (height as f64 * percent / 100.0) as u32;

    let left = content.x.saturating_sub(pad_h).min(width);
    let top = content.y.saturating_sub(pad_v).min(height);
    let right = content.right().saturating_add(pad_h).min(width).max(left);
    let bottom = content.bottom().saturating_add(pad_v).min(height).max(top);

    CardRegion {
        bounds: BoundingBox::from_edges(left, top, right, bottom),
        content: *content,
        source_size: source,
    }
}

// ============================================================
// Extractor
// ============================================================

/// Output image plus what produced it
#[derive(Debug, Clone)]
pub struct CardExtraction {
    pub image: RasterImage,
    pub outcome: ExtractionOutcome,
}

/// Content card extractor
#[derive(Debug, Clone, Default)]
pub struct CardExtractor {
    options: CardOptions,
}

impl CardExtractor {
    pub fn new(options: CardOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CardOptions {
        &self.options
    }

    /// Extract from an in-memory image.
    ///
    /// `NoContentFound` never escapes: it ends in a degraded result.
    pub fn extract(
        &self,
        image: &RasterImage,
        debug: Option<&DebugArtifacts>,
    ) -> Result<CardExtraction> {
        if image.is_empty() {
            return Err(CardError::EmptyImage);
        }

        match fallback::run_ladder(image, &self.options, debug) {
            Ok(detection) => {
                let region = pad_and_clip(
                    &detection.content,
                    image.dimensions(),
                    self.options.padding_percent,
                );
                tracing::info!(
                    detector = %detection.detector,
                    region = %region.bounds,
                    "card region selected"
                );
                Ok(CardExtraction {
                    image: image.crop(&region.bounds),
                    outcome: ExtractionOutcome::Found {
                        region,
                        detector: detection.detector,
                    },
                })
            }
            Err(CardError::NoContentFound) => {
                let upscaled = fallback::upscale_only(image, self.options.upscale_factor);
                tracing::warn!(
                    width = upscaled.width(),
                    height = upscaled.height(),
                    "no content region found, returning upscaled source"
                );
                Ok(CardExtraction {
                    outcome: ExtractionOutcome::Degraded {
                        width: upscaled.width(),
                        height: upscaled.height(),
                    },
                    image: upscaled,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Read `input`, extract, and write the result to `output`
    ///
    /// The decoded image is tagged with `scale_factor` from the options.
    pub fn extract_file(
        &self,
        input: &Path,
        output: &Path,
        debug: bool,
    ) -> Result<ExtractionOutcome> {
        self.extract_file_with_progress(input, output, debug, &NoopProgress)
    }

    /// [`extract_file`](Self::extract_file), reporting the
    /// [`ProcessingStage::Extracting`] stage to `progress`
    pub fn extract_file_with_progress(
        &self,
        input: &Path,
        output: &Path,
        debug: bool,
        progress: &dyn ProgressCallback,
    ) -> Result<ExtractionOutcome> {
        if !input.exists() {
            return Err(CardError::ImageNotFound(input.to_path_buf()));
        }

        let image = RasterImage::open(input, self.options.scale_factor)
            .map_err(|e| CardError::InvalidImage(e.to_string()))?;
        if image.is_empty() {
            return Err(CardError::EmptyImage);
        }
        tracing::debug!(
            path = %input.display(),
            width = image.width(),
            height = image.height(),
            channels = image.channels(),
            "loaded source image"
        );

        progress.on_stage(ProcessingStage::Extracting, 1);
        let artifacts = debug.then(|| DebugArtifacts::for_output(output));
        let extraction = self.extract(&image, artifacts.as_ref())?;

        extraction
            .image
            .as_dynamic()
            .save(output)
            .map_err(|e| CardError::SaveFailed(e.to_string()))?;
        tracing::info!(path = %output.display(), "card image saved");
        progress.on_progress(1, 1);

        let summary = match &extraction.outcome {
            ExtractionOutcome::Found { detector, .. } => format!("{} detector", detector),
            ExtractionOutcome::Degraded { .. } => "no content, upscaled source".to_string(),
        };
        progress.on_stage_complete(ProcessingStage::Extracting, &summary);

        Ok(extraction.outcome)
    }
}

/// Extract the content card from `input_image_path` into `output_image_path`.
///
/// Returns `true` only when a genuine content region was found. A degraded
/// result still writes the upscaled source; fatal errors write nothing.
pub fn extract_card_region(
    input_image_path: &Path,
    output_image_path: &Path,
    min_area: u32,
    debug: bool,
) -> bool {
    let options = CardOptions::builder().min_area(min_area).build();
    match CardExtractor::new(options).extract_file(input_image_path, output_image_path, debug) {
        Ok(outcome) => outcome.is_found(),
        Err(e) => {
            tracing::error!(path = %input_image_path.display(), error = %e, "card extraction failed");
            false
        }
    }
}
