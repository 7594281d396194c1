//! Diagnostic artifacts written next to the extraction output
//!
//! Nothing here affects control flow: save failures are logged and dropped.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

use super::contours::ContourRegion;
use crate::raster::{BinaryMask, BoundingBox, RasterImage};

/// Suffix of the adaptive threshold mask
pub const THRESH_SUFFIX: &str = "_thresh";

/// Suffix of the merged mask
pub const CONNECTED_SUFFIX: &str = "_connected";

/// Suffix of the anchor/union overlay
pub const OVERLAY_SUFFIX: &str = "_largest_contour";

const ANCHOR_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const UNION_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Writes intermediate images using the output path as a name template
#[derive(Debug, Clone)]
pub struct DebugArtifacts {
    dir: PathBuf,
    stem: String,
}

impl DebugArtifacts {
    pub fn for_output(output_path: &Path) -> Self {
        let dir = output_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let stem = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "card".to_string());
        Self { dir, stem }
    }

    /// `<dir>/<stem><suffix>.png`
    pub fn path_for(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{}.png", self.stem, suffix))
    }

    pub fn save_mask(&self, suffix: &str, mask: &BinaryMask) {
        let path = self.path_for(suffix);
        match mask.as_gray().save(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "saved debug mask"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to save debug mask"),
        }
    }

    /// Anchor outline in green, content union in red
    pub fn save_overlay(&self, source: &RasterImage, anchor: &ContourRegion, union: &BoundingBox) {
        let mut canvas: RgbImage = source.as_dynamic().to_rgb8();
        let (width, height) = canvas.dimensions();

        for p in &anchor.points {
            for dy in -1..=1i32 {
                for dx in -1..=1i32 {
                    let (x, y) = (p.x + dx, p.y + dy);
                    if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                        canvas.put_pixel(x as u32, y as u32, ANCHOR_COLOR);
                    }
                }
            }
        }

        if !union.is_empty() {
            let rect = Rect::at(union.x as i32, union.y as i32).of_size(union.width, union.height);
            draw_hollow_rect_mut(&mut canvas, rect, UNION_COLOR);
        }

        let path = self.path_for(OVERLAY_SUFFIX);
        if let Err(e) = canvas.save(&path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to save debug overlay");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_naming() {
        let debug = DebugArtifacts::for_output(Path::new("/tmp/out/card.png"));
        assert_eq!(
            debug.path_for(THRESH_SUFFIX),
            PathBuf::from("/tmp/out/card_thresh.png")
        );
        assert_eq!(
            debug.path_for(CONNECTED_SUFFIX),
            PathBuf::from("/tmp/out/card_connected.png")
        );
    }

    #[test]
    fn test_artifact_naming_bare_file() {
        let debug = DebugArtifacts::for_output(Path::new("result.jpg"));
        assert_eq!(
            debug.path_for(OVERLAY_SUFFIX),
            PathBuf::from("result_largest_contour.png")
        );
    }

    #[test]
    fn test_save_mask_to_missing_dir_is_not_fatal() {
        let debug = DebugArtifacts::for_output(Path::new("/nonexistent/dir/card.png"));
        debug.save_mask(THRESH_SUFFIX, &BinaryMask::new(4, 4));
    }
}
