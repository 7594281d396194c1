//! card-extract - content card cropping and PDF page stitching
//!
//! Two independent pipelines share one raster layer:
//!
//! - [`card`]: finds the region of a rendered screenshot that holds content
//!   (text, figures, a chat bubble) and crops it, falling back through
//!   alternative detectors and finally a plain upscale.
//! - [`stitch`]: rasterizes a PDF, trims background rows between pages in
//!   parallel and stacks the pages into one continuous image.
//!
//! # Example
//!
//! ```rust,no_run
//! use card_extract::{extract_card_region, stitch_pdf_pages};
//! use std::path::Path;
//!
//! if let Some(combined) = stitch_pdf_pages(Path::new("thread.pdf"), Path::new("out"), 300) {
//!     let found = extract_card_region(&combined, Path::new("out/card.png"), 500, false);
//!     println!("content found: {}", found);
//! }
//! ```

pub mod card;
pub mod cli;
pub mod config;
pub mod progress;
pub mod raster;
pub mod stitch;

// Raster primitives
pub use raster::{BinaryMask, BoundingBox, ChannelMode, RasterImage};

// Card extraction
pub use card::{
    extract_card_region, pad_and_clip, CardError, CardExtraction, CardExtractor, CardOptions,
    CardOptionsBuilder, CardRegion, DebugArtifacts, Detector, ExtractionOutcome,
};

// Page stitching
pub use stitch::{
    stitch_pdf_pages, CanvasCompositor, CombinedImage, PageError, PageImage, PageOutcome,
    PagePipeline, PageRasterizer, PageStitcher, PageSummary, PageTrimmer, PdftoppmRasterizer,
    StitchError, StitchOptions, StitchOptionsBuilder, StitchResult, TrimBounds, TrimmedPage,
};

// CLI & config
pub use cli::{CardArgs, Cli, Commands, ExtractArgs, RunArgs, StitchArgs, StitchTuning};
pub use config::{CliOverrides, Config, ConfigError};

// Progress
pub use progress::{NoopProgress, OutputMode, ProcessingStage, ProgressCallback};

/// Process exit codes
pub mod exit_codes {
    /// Completed successfully
    pub const SUCCESS: i32 = 0;
    /// Unrecoverable error
    pub const GENERAL_ERROR: i32 = 1;
    /// No content region found; the upscaled source was written instead
    pub const DEGRADED: i32 = 2;
    /// Input file does not exist
    pub const INPUT_NOT_FOUND: i32 = 3;
}
