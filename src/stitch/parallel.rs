//! Parallel page pipeline
//!
//! Pages are trimmed on a dedicated rayon pool. Results land in a pre-sized
//! slot vector indexed by page number, each slot written by exactly one
//! worker, so reassembly is a plain ordered read and never depends on
//! completion order. A failing or panicking page is replaced by its
//! untrimmed original.

use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::trim::PageTrimmer;
use super::types::{PageError, PageImage, Result, StitchError, TrimmedPage};
use crate::progress::{ProcessingStage, ProgressCallback};
use crate::raster::RasterImage;

/// Largest page side accepted after the optional pre-trim upscale
const MAX_PAGE_DIMENSION: f64 = 65_535.0;

/// Worker count defaulting to the number of logical CPUs
pub fn default_workers() -> usize {
    num_cpus::get().max(1)
}

/// Trims every page on a bounded worker pool
#[derive(Debug, Clone)]
pub struct PagePipeline {
    workers: usize,
    trimmer: PageTrimmer,
    page_scale: f32,
}

impl PagePipeline {
    /// `workers == 0` selects [`default_workers`]
    pub fn new(workers: usize, trimmer: PageTrimmer, page_scale: f32) -> Self {
        Self {
            workers: if workers == 0 {
                default_workers()
            } else {
                workers
            },
            trimmer,
            page_scale,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Trim all pages; output is in page-index order
    pub fn run(
        &self,
        pages: &[PageImage],
        progress: &dyn ProgressCallback,
    ) -> Result<Vec<TrimmedPage>> {
        let total = pages.len();
        self.run_with(pages, progress, |page| self.process_page(page, total))
    }

    /// Drive `process` over every page on the pool
    fn run_with<F>(
        &self,
        pages: &[PageImage],
        progress: &dyn ProgressCallback,
        process: F,
    ) -> Result<Vec<TrimmedPage>>
    where
        F: Fn(&PageImage) -> std::result::Result<TrimmedPage, PageError> + Sync,
    {
        let total = pages.len();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| StitchError::WorkerPool(e.to_string()))?;

        progress.on_stage(ProcessingStage::Trimming, total);
        tracing::info!(pages = total, workers = self.workers, "trimming pages");

        let mut slots: Vec<Option<TrimmedPage>> = vec![None; total];
        let completed = AtomicUsize::new(0);

        pool.install(|| {
            slots
                .par_iter_mut()
                .zip(pages.par_iter())
                .for_each(|(slot, page)| {
                    *slot = Some(process_isolated(page, &process));
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress.on_progress(done, total);
                });
        });

        let trimmed: Vec<TrimmedPage> = slots
            .into_iter()
            .zip(pages)
            .map(|(slot, page)| {
                slot.unwrap_or_else(|| {
                    TrimmedPage::substitute(page, &PageError::Panicked("no result".to_string()))
                })
            })
            .collect();

        progress.on_stage_complete(ProcessingStage::Trimming, &format!("{} pages", total));
        Ok(trimmed)
    }

    fn process_page(
        &self,
        page: &PageImage,
        total: usize,
    ) -> std::result::Result<TrimmedPage, PageError> {
        if page.image.is_empty() {
            return Err(PageError::EmptyPage);
        }

        if (self.page_scale - 1.0).abs() <= f32::EPSILON {
            return Ok(self.trimmer.trim(page, total));
        }

        let scaled = PageImage::new(page.index, self.upscale(&page.image, page.index));
        Ok(self.trimmer.trim(&scaled, total))
    }

    /// Optional linear upscale before trimming; oversize results keep the
    /// page at native resolution
    fn upscale(&self, image: &RasterImage, index: usize) -> RasterImage {
        let scale = self.page_scale as f64;
        let width = image.width() as f64 * scale;
        let height = image.height() as f64 * scale;

        let valid = scale.is_finite() && scale > 0.0;
        if !valid || width > MAX_PAGE_DIMENSION || height > MAX_PAGE_DIMENSION {
            tracing::warn!(
                page = index,
                scale = self.page_scale,
                "page upscale rejected, using native resolution"
            );
            return image.clone();
        }

        image.resize_linear(self.page_scale)
    }
}

/// Run one page, converting every failure into a substituted page
fn process_isolated<F>(page: &PageImage, process: &F) -> TrimmedPage
where
    F: Fn(&PageImage) -> std::result::Result<TrimmedPage, PageError>,
{
    let result = panic::catch_unwind(AssertUnwindSafe(|| process(page)));
    let error = match result {
        Ok(Ok(trimmed)) => return trimmed,
        Ok(Err(e)) => e,
        Err(payload) => PageError::Panicked(panic_message(payload.as_ref())),
    };

    tracing::warn!(
        page = page.index,
        error = %error,
        "page processing failed, using original"
    );
    TrimmedPage::substitute(page, &error)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
