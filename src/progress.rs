//! Progress reporting for the stitch and extraction pipelines.
//!
//! Library code reports through [`ProgressCallback`]; the CLI renders it with
//! an `indicatif` bar, tests and library callers use [`NoopProgress`].

use std::fmt;

/// Processing stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Rasterizing PDF pages
    Rasterizing,
    /// Trimming page borders
    Trimming,
    /// Pasting pages onto the canvas
    Compositing,
    /// Writing the combined image
    Writing,
    /// Extracting the content card
    Extracting,
}

impl ProcessingStage {
    /// Get the name of the stage
    pub fn name(&self) -> &'static str {
        match self {
            ProcessingStage::Rasterizing => "Rasterizing",
            ProcessingStage::Trimming => "Trimming",
            ProcessingStage::Compositing => "Compositing",
            ProcessingStage::Writing => "Writing",
            ProcessingStage::Extracting => "Extracting",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum OutputMode {
    /// No output
    Quiet,
    /// Normal output (stage display only)
    #[default]
    Normal,
    /// Verbose output (page-level progress)
    Verbose,
    /// Very verbose (debug detail)
    VeryVerbose,
}

impl OutputMode {
    /// Create OutputMode from verbosity level
    pub fn from_verbosity(level: u8) -> Self {
        match level {
            0 => OutputMode::Normal,
            1 => OutputMode::Verbose,
            _ => OutputMode::VeryVerbose,
        }
    }

    /// Check if output should be shown at this mode
    pub fn should_show(&self, required: OutputMode) -> bool {
        *self != OutputMode::Quiet && *self >= required
    }

    /// Maximum log level matching this mode
    pub fn log_level(&self) -> tracing::Level {
        match self {
            OutputMode::Quiet => tracing::Level::ERROR,
            OutputMode::Normal => tracing::Level::WARN,
            OutputMode::Verbose => tracing::Level::INFO,
            OutputMode::VeryVerbose => tracing::Level::DEBUG,
        }
    }
}

/// Receives stage and per-page progress. Called from worker threads.
pub trait ProgressCallback: Send + Sync {
    fn on_stage(&self, stage: ProcessingStage, total: usize);

    fn on_progress(&self, current: usize, total: usize);

    fn on_stage_complete(&self, stage: ProcessingStage, message: &str);
}

/// Progress sink that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_stage(&self, _stage: ProcessingStage, _total: usize) {}

    fn on_progress(&self, _current: usize, _total: usize) {}

    fn on_stage_complete(&self, _stage: ProcessingStage, _message: &str) {}
}
