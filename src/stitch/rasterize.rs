//! PDF rasterization seam
//!
//! Rasterizing a PDF is delegated to an external tool. The default
//! implementation runs Poppler's `pdftoppm` into a temporary directory and
//! decodes the resulting PNG files in page order.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::types::{PageImage, Result, StitchError};
use crate::raster::RasterImage;

/// Name of the Poppler rasterizer binary
pub const PDFTOPPM: &str = "pdftoppm";

/// File prefix pdftoppm writes pages under
const PAGE_PREFIX: &str = "page";

/// Produces one raster image per PDF page, in page order
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, pdf_path: &Path, dpi: u32) -> Result<Vec<PageImage>>;
}

/// `pdftoppm`-backed rasterizer
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    binary: PathBuf,
}

impl PdftoppmRasterizer {
    /// Find `pdftoppm` on `PATH`
    pub fn locate() -> Result<Self> {
        which::which(PDFTOPPM)
            .map(|binary| Self { binary })
            .map_err(|e| StitchError::RasterizerUnavailable(format!("{}: {}", PDFTOPPM, e)))
    }

    /// Use an explicit binary path
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf_path: &Path, dpi: u32) -> Result<Vec<PageImage>> {
        let workdir = tempfile::tempdir()?;
        let prefix = workdir.path().join(PAGE_PREFIX);

        tracing::info!(pdf = %pdf_path.display(), dpi, "rasterizing PDF");
        let output = Command::new(&self.binary)
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-png")
            .arg(pdf_path)
            .arg(&prefix)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StitchError::RasterizeFailed(stderr.trim().to_string()));
        }

        let files = page_files(workdir.path())?;
        let mut pages = Vec::with_capacity(files.len());
        for (index, path) in files.iter().enumerate() {
            let image = RasterImage::open(path, 1.0).map_err(|e| StitchError::Decode {
                page: index,
                message: e.to_string(),
            })?;
            if image.is_empty() {
                return Err(StitchError::Decode {
                    page: index,
                    message: "empty raster".to_string(),
                });
            }
            pages.push(PageImage::new(index, image));
        }

        tracing::debug!(pages = pages.len(), "rasterized pages decoded");
        Ok(pages)
    }
}

/// Page PNGs in `dir` sorted by their numeric page suffix
fn page_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut numbered: Vec<(u32, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter_map(|path| page_number(&path).map(|n| (n, path)))
        .collect();
    numbered.sort_by_key(|(n, _)| *n);
    Ok(numbered.into_iter().map(|(_, path)| path).collect())
}

/// `page-007.png` -> 7
fn page_number(path: &Path) -> Option<u32> {
    if path.extension()?.to_str()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix(PAGE_PREFIX)?.strip_prefix('-')?;
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_number() {
        assert_eq!(page_number(Path::new("/tmp/x/page-1.png")), Some(1));
        assert_eq!(page_number(Path::new("/tmp/x/page-012.png")), Some(12));
        assert_eq!(page_number(Path::new("/tmp/x/page-3.ppm")), None);
        assert_eq!(page_number(Path::new("/tmp/x/other-3.png")), None);
    }

    #[test]
    fn test_page_files_sorted_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.png", "page-2.png", "page-1.png", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let files = page_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["page-1.png", "page-2.png", "page-10.png"]);
    }

    #[test]
    fn test_missing_binary_fails_cleanly() {
        let rasterizer = PdftoppmRasterizer::with_binary("/nonexistent/pdftoppm");
        let result = rasterizer.rasterize(Path::new("doc.pdf"), 72);
        assert!(matches!(result, Err(StitchError::IoError(_))));
    }
}
