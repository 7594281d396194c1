//! Fallback ladder
//!
//! Detectors are tried in [`Detector::LADDER`] order. The first one that
//! yields a content box wins; `NoContentFound` advances to the next rung.
//! When every rung fails the caller falls through to [`upscale_only`].

use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::morphology::close;
use imageproc::region_labelling::{connected_components, Connectivity};

use super::binarize::Binarizer;
use super::contours::{select_region, ContourCollector};
use super::debug::{DebugArtifacts, CONNECTED_SUFFIX, THRESH_SUFFIX};
use super::merge::RegionMerger;
use super::types::{CardError, Detector, Result};
use super::CardOptions;
use crate::raster::{BinaryMask, BoundingBox, RasterImage};

// ============================================================
// Constants
// ============================================================

/// First gray level of the blob detector's threshold sweep
const BLOB_MIN_THRESHOLD: u8 = 10;

/// Last gray level of the sweep
const BLOB_MAX_THRESHOLD: u8 = 220;

/// Gray level increment between sweeps
const BLOB_THRESHOLD_STEP: u8 = 10;

/// Consecutive levels a blob must persist across
const BLOB_MIN_REPEATABILITY: usize = 2;

/// Blobs covering more than this share of the image are background
const BLOB_MAX_AREA_FRACTION: f64 = 0.9;

/// Content box found by one rung of the ladder
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub detector: Detector,
    /// Union of content boxes, before padding
    pub content: BoundingBox,
}

/// Run every detector in order until one finds content
pub fn run_ladder(
    image: &RasterImage,
    options: &CardOptions,
    debug: Option<&DebugArtifacts>,
) -> Result<Detection> {
    for detector in Detector::LADDER {
        match detector.detect(image, options, debug) {
            Ok(content) => {
                tracing::info!(%detector, %content, "content region detected");
                return Ok(Detection { detector, content });
            }
            Err(CardError::NoContentFound) => {
                tracing::info!(%detector, "detector found no content, advancing");
            }
            Err(e) => return Err(e),
        }
    }
    Err(CardError::NoContentFound)
}

/// Terminal rung: linear upscale of the whole source
pub fn upscale_only(image: &RasterImage, factor: u32) -> RasterImage {
    image.resize_linear(factor.max(1) as f32)
}

impl Detector {
    /// Run this detector; every detector is built fresh per call
    pub fn detect(
        &self,
        image: &RasterImage,
        options: &CardOptions,
        debug: Option<&DebugArtifacts>,
    ) -> Result<BoundingBox> {
        match self {
            Detector::Primary => detect_primary(image, options, debug),
            Detector::Blob => detect_blobs(image, options),
            Detector::GlobalThreshold => detect_global_threshold(image, options),
        }
    }
}

fn detect_primary(
    image: &RasterImage,
    options: &CardOptions,
    debug: Option<&DebugArtifacts>,
) -> Result<BoundingBox> {
    let scale = image.scale();
    let binarizer = Binarizer::new(
        options.base_blur_kernel,
        options.base_block_size,
        options.adaptive_offset,
        scale,
    );
    let thresh = binarizer.binarize(image);
    if let Some(debug) = debug {
        debug.save_mask(THRESH_SUFFIX, &thresh);
    }

    let merged = RegionMerger::new(options.base_merge_length, scale).merge(&thresh);
    if let Some(debug) = debug {
        debug.save_mask(CONNECTED_SUFFIX, &merged);
    }

    let survivors = ContourCollector::new(options.min_area, scale).collect(&merged);
    let selection = select_region(survivors)?;
    tracing::debug!(
        anchor = %selection.anchor.bounds,
        anchor_area = selection.anchor.area,
        union = %selection.union,
        survivors = selection.survivors,
        "primary selection"
    );

    if let Some(debug) = debug {
        debug.save_overlay(image, &selection.anchor, &selection.union);
    }
    Ok(selection.union)
}

// ============================================================
// Blob detector
// ============================================================

#[derive(Debug, Clone, Copy)]
struct Blob {
    bounds: BoundingBox,
    area: u64,
}

impl Blob {
    fn matches(&self, other: &Blob) -> bool {
        let ratio = self.area as f64 / other.area.max(1) as f64;
        self.bounds.intersects(&other.bounds) && (0.5..=2.0).contains(&ratio)
    }
}

/// Dark connected components at one threshold level
fn blobs_at_level(gray: &GrayImage, level: u8) -> Vec<Blob> {
    let (width, height) = gray.dimensions();
    let binary = GrayImage::from_fn(width, height, |x, y| {
        Luma([if gray.get_pixel(x, y).0[0] < level { 255 } else { 0 }])
    });
    let labels = connected_components(&binary, Connectivity::Eight, Luma([0u8]));

    let mut stats: Vec<Option<(u32, u32, u32, u32, u64)>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let id = label.0[0] as usize;
        if id == 0 {
            continue;
        }
        if stats.len() < id {
            stats.resize(id, None);
        }
        let entry = &mut stats[id - 1];
        *entry = Some(match *entry {
            None => (x, y, x, y, 1),
            Some((x0, y0, x1, y1, n)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y), n + 1),
        });
    }

    stats
        .into_iter()
        .flatten()
        .map(|(x0, y0, x1, y1, area)| Blob {
            bounds: BoundingBox::from_edges(x0, y0, x1 + 1, y1 + 1),
            area,
        })
        .collect()
}

/// Multi-level stable region detector.
///
/// The luminance image is swept through increasing dark thresholds. A blob
/// counts when a matching blob (overlapping, comparable size) exists at
/// enough consecutive levels; its box at the last matched level is kept.
fn detect_blobs(image: &RasterImage, options: &CardOptions) -> Result<BoundingBox> {
    let gray = image.to_luma8();
    let image_area = gray.width() as u64 * gray.height() as u64;
    let min_area = ContourCollector::new(options.min_area, image.scale()).min_area;
    let max_area = image_area as f64 * BLOB_MAX_AREA_FRACTION;

    // (blob, consecutive levels seen)
    let mut tracks: Vec<(Blob, usize)> = Vec::new();
    let mut accepted: Vec<BoundingBox> = Vec::new();

    let mut level = BLOB_MIN_THRESHOLD;
    while level <= BLOB_MAX_THRESHOLD {
        let blobs: Vec<Blob> = blobs_at_level(&gray, level)
            .into_iter()
            .filter(|b| b.area as f64 >= min_area && (b.area as f64) <= max_area)
            .collect();

        let next: Vec<(Blob, usize)> = blobs
            .into_iter()
            .map(|blob| {
                let seen = tracks
                    .iter()
                    .filter(|(prev, _)| blob.matches(prev))
                    .map(|(_, n)| *n)
                    .max()
                    .unwrap_or(0);
                (blob, seen + 1)
            })
            .collect();

        // Tracks that end here keep their final box if they were stable
        for (prev, n) in &tracks {
            let continues = next.iter().any(|(b, _)| b.matches(prev));
            if !continues && *n >= BLOB_MIN_REPEATABILITY {
                accepted.push(prev.bounds);
            }
        }

        tracks = next;
        level = match level.checked_add(BLOB_THRESHOLD_STEP) {
            Some(l) => l,
            None => break,
        };
    }

    accepted.extend(
        tracks
            .iter()
            .filter(|(_, n)| *n >= BLOB_MIN_REPEATABILITY)
            .map(|(b, _)| b.bounds),
    );

    tracing::debug!(blobs = accepted.len(), "blob detector finished");
    BoundingBox::union_all(&accepted).ok_or(CardError::NoContentFound)
}

// ============================================================
// Global threshold detector
// ============================================================

/// Otsu threshold (inverse), square closing, contour union
fn detect_global_threshold(image: &RasterImage, options: &CardOptions) -> Result<BoundingBox> {
    let gray = image.to_luma8();
    let (min, max) = gray
        .as_raw()
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if min >= max {
        return Err(CardError::NoContentFound);
    }

    let level = otsu_level(&gray);
    let binary = BinaryMask::from_fn(gray.width(), gray.height(), |x, y| {
        gray.get_pixel(x, y).0[0] <= level
    });
    let radius = (options.global_close_size / 2).min(u8::MAX as u32) as u8;
    let closed = BinaryMask::from_gray(close(binary.as_gray(), Norm::LInf, radius));

    let survivors = ContourCollector::new(options.min_area, image.scale()).collect(&closed);
    tracing::debug!(level, survivors = survivors.len(), "global threshold contours");
    Ok(select_region(survivors)?.union)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn page_with_block(width: u32, height: u32, block: BoundingBox, value: u8) -> RasterImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            if x >= block.x && x < block.right() && y >= block.y && y < block.bottom() {
                Rgb([value, value, value])
            } else {
                Rgb([255, 255, 255])
            }
        });
        RasterImage::new(DynamicImage::ImageRgb8(img), 1.0)
    }

    fn options() -> CardOptions {
        CardOptions {
            min_area: 100,
            ..Default::default()
        }
    }

    #[test]
    fn test_blob_detector_finds_block() {
        let block = BoundingBox::new(40, 30, 60, 40);
        let image = page_with_block(200, 150, block, 0);
        let found = Detector::Blob.detect(&image, &options(), None).unwrap();
        assert_eq!(found, block);
    }

    #[test]
    fn test_blob_detector_blank_image() {
        let image = page_with_block(100, 100, BoundingBox::new(0, 0, 0, 0), 0);
        assert!(matches!(
            Detector::Blob.detect(&image, &options(), None),
            Err(CardError::NoContentFound)
        ));
    }

    #[test]
    fn test_global_threshold_finds_gray_block() {
        let block = BoundingBox::new(20, 20, 50, 30);
        let image = page_with_block(150, 100, block, 120);
        let found = Detector::GlobalThreshold
            .detect(&image, &options(), None)
            .unwrap();
        assert_eq!(found, block);
    }

    #[test]
    fn test_global_threshold_uniform_image() {
        let image = page_with_block(50, 50, BoundingBox::new(0, 0, 0, 0), 0);
        assert!(matches!(
            Detector::GlobalThreshold.detect(&image, &options(), None),
            Err(CardError::NoContentFound)
        ));
    }

    #[test]
    fn test_ladder_exhausted_on_blank_image() {
        let image = page_with_block(80, 60, BoundingBox::new(0, 0, 0, 0), 0);
        assert!(matches!(
            run_ladder(&image, &options(), None),
            Err(CardError::NoContentFound)
        ));
    }

    #[test]
    fn test_ladder_stops_at_primary() {
        let block = BoundingBox::new(50, 40, 100, 60);
        let image = page_with_block(300, 200, block, 0);
        let detection = run_ladder(&image, &options(), None).unwrap();
        assert_eq!(detection.detector, Detector::Primary);
        assert!(detection.content.contains(&BoundingBox::new(51, 41, 98, 58)));
    }

    /// Offset above any local mean, so the adaptive threshold marks nothing
    fn primary_disabled() -> CardOptions {
        CardOptions {
            adaptive_offset: 255,
            ..options()
        }
    }

    #[test]
    fn test_ladder_advances_to_blob() {
        let block = BoundingBox::new(40, 30, 60, 40);
        let image = page_with_block(200, 150, block, 0);
        let detection = run_ladder(&image, &primary_disabled(), None).unwrap();
        assert_eq!(detection.detector, Detector::Blob);
        assert_eq!(detection.content, block);
    }

    #[test]
    fn test_ladder_advances_to_global_threshold() {
        // Lighter than the last blob sweep level
        let block = BoundingBox::new(20, 20, 50, 30);
        let image = page_with_block(150, 100, block, 240);
        let detection = run_ladder(&image, &primary_disabled(), None).unwrap();
        assert_eq!(detection.detector, Detector::GlobalThreshold);
        assert_eq!(detection.content, block);
    }

    #[test]
    fn test_upscale_only_triples() {
        let image = page_with_block(21, 13, BoundingBox::new(0, 0, 0, 0), 0);
        let upscaled = upscale_only(&image, 3);
        assert_eq!(upscaled.dimensions(), (63, 39));
    }
}
