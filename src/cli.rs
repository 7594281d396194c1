//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::progress::OutputMode;

/// Crop content cards out of screenshots and stitch PDF pages into one image
#[derive(Parser, Debug)]
#[command(name = "card-extract")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Output mode derived from `-v` / `--quiet`
    pub fn output_mode(&self) -> OutputMode {
        if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::from_verbosity(self.verbose)
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crop the content card out of a screenshot
    Extract(ExtractArgs),
    /// Rasterize a PDF and stitch its pages into one image
    Stitch(StitchArgs),
    /// Stitch a PDF, then extract a card from the combined image
    Run(RunArgs),
    /// Show system and configuration information
    Info,
}

/// Arguments for the extract command
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Input screenshot
    pub input: PathBuf,

    /// Output image path
    pub output: PathBuf,

    #[command(flatten)]
    pub card: CardArgs,

    /// Write intermediate masks and an overlay next to the output
    #[arg(long)]
    pub debug: bool,

    /// Print the extraction outcome as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the stitch command
#[derive(Args, Debug)]
pub struct StitchArgs {
    /// Input PDF
    pub pdf: PathBuf,

    /// Output directory for `<stem>_combined.png`
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub stitch: StitchTuning,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Input PDF
    pub pdf: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub stitch: StitchTuning,

    #[command(flatten)]
    pub card: CardArgs,

    /// Write intermediate masks and an overlay next to the card
    #[arg(long)]
    pub debug: bool,
}

/// Card extraction tuning
#[derive(Args, Debug, Clone, Default)]
pub struct CardArgs {
    /// Minimum content area in baseline pixels
    #[arg(long)]
    pub min_area: Option<u32>,

    /// Input resolution relative to the baseline
    #[arg(long)]
    pub scale: Option<f32>,

    /// Padding per side, percent of the image size
    #[arg(long)]
    pub padding: Option<f32>,
}

/// Page stitching tuning
#[derive(Args, Debug, Clone, Default)]
pub struct StitchTuning {
    /// Rasterization DPI
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Worker threads (default: number of CPUs)
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Left-align narrower pages instead of centering them
    #[arg(long)]
    pub left_align: bool,

    /// Linear upscale applied to each page before trimming
    #[arg(long)]
    pub page_scale: Option<f32>,
}
