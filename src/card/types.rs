//! Common types for the card extraction module

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::raster::BoundingBox;

/// Card extraction error types
#[derive(Debug, Error)]
pub enum CardError {
    #[error("Image not found: {0}")]
    ImageNotFound(PathBuf),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Image has no pixels")]
    EmptyImage,

    #[error("No content region found")]
    NoContentFound,

    #[error("Failed to save image: {0}")]
    SaveFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CardError>;

/// Detectors of the fallback ladder, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Detector {
    /// Adaptive threshold + directional closing + contour union
    Primary,
    /// Multi-level stable blob detection
    Blob,
    /// Otsu threshold + square closing + contour union
    GlobalThreshold,
}

impl Detector {
    /// Ladder order
    pub const LADDER: [Detector; 3] = [Detector::Primary, Detector::Blob, Detector::GlobalThreshold];

    pub fn name(&self) -> &'static str {
        match self {
            Detector::Primary => "primary",
            Detector::Blob => "blob",
            Detector::GlobalThreshold => "global-threshold",
        }
    }
}

impl fmt::Display for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Final crop rectangle, padded and clipped to the source extent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CardRegion {
    /// Crop rectangle in source pixel coordinates
    pub bounds: BoundingBox,
    /// Union of surviving content boxes before padding
    pub content: BoundingBox,
    /// Source image size
    pub source_size: (u32, u32),
}

impl CardRegion {
    /// Check `0 <= x <= x + w <= width` and the same vertically
    pub fn is_within_source(&self) -> bool {
        self.bounds.right() <= self.source_size.0 && self.bounds.bottom() <= self.source_size.1
    }
}

/// Result of a card extraction run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// A content region was found and cropped
    Found {
        region: CardRegion,
        detector: Detector,
    },
    /// No detector found content; the source was upscaled and written whole
    Degraded { width: u32, height: u32 },
}

impl ExtractionOutcome {
    /// Whether a genuine content region was found
    pub fn is_found(&self) -> bool {
        matches!(self, ExtractionOutcome::Found { .. })
    }

    pub fn region(&self) -> Option<&CardRegion> {
        match self {
            ExtractionOutcome::Found { region, .. } => Some(region),
            ExtractionOutcome::Degraded { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_order() {
        assert_eq!(Detector::LADDER[0], Detector::Primary);
        assert_eq!(Detector::LADDER[2], Detector::GlobalThreshold);
    }

    #[test]
    fn test_region_within_source() {
        let region = CardRegion {
            bounds: BoundingBox::new(0, 0, 100, 50),
            content: BoundingBox::new(10, 10, 80, 30),
            source_size: (100, 50),
        };
        assert!(region.is_within_source());

        let outside = CardRegion {
            bounds: BoundingBox::new(1, 0, 100, 50),
            ..region
        };
        assert!(!outside.is_within_source());
    }

    #[test]
    fn test_outcome_json() {
        let outcome = ExtractionOutcome::Degraded {
            width: 30,
            height: 15,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"status\":\"degraded\""));
        assert!(!outcome.is_found());
    }
}
