//! card-extract - content card cropping and PDF page stitching
//!
//! CLI entry point

use anyhow::Context;
use card_extract::{
    exit_codes,
    // CLI
    CardArgs, Cli, Commands, ExtractArgs, RunArgs, StitchArgs, StitchTuning,
    // Config
    CliOverrides, Config,
    // Pipelines
    CardExtractor, ExtractionOutcome, PageStitcher, PdftoppmRasterizer,
    // Progress tracking
    OutputMode, ProcessingStage, ProgressCallback,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// File name of the card written by the run command
const RUN_CARD_FILE: &str = "card.png";

fn main() {
    let cli = Cli::parse();
    let mode = cli.output_mode();
    init_logging(mode, cli.verbose);

    let config = load_config(cli.config.as_deref());

    let result = match &cli.command {
        Commands::Extract(args) => run_extract(args, &config, mode),
        Commands::Stitch(args) => run_stitch(args, &config, mode),
        Commands::Run(args) => run_pipeline(args, &config, mode),
        Commands::Info => run_info(&config),
    };

    std::process::exit(match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_codes::GENERAL_ERROR
        }
    });
}

// ============ Logging & Config ============

fn init_logging(mode: OutputMode, verbosity: u8) {
    let level = if verbosity >= 3 {
        tracing::Level::TRACE
    } else {
        mode.log_level()
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Explicit `--config` first, then the search path; failures fall back to
/// defaults with a warning
fn load_config(path: Option<&Path>) -> Config {
    let loaded = match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    loaded.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config file, using defaults");
        Config::default()
    })
}

/// Collect CLI values that override the config file
fn create_cli_overrides(card: Option<&CardArgs>, stitch: Option<&StitchTuning>) -> CliOverrides {
    let mut overrides = CliOverrides::new();

    if let Some(card) = card {
        overrides.min_area = card.min_area;
        overrides.scale_factor = card.scale;
        overrides.padding_percent = card.padding;
    }

    if let Some(stitch) = stitch {
        overrides.dpi = stitch.dpi;
        overrides.workers = stitch.workers;
        overrides.page_scale = stitch.page_scale;
        // Only an explicit --left-align overrides the file value
        if stitch.left_align {
            overrides.center_pages = Some(false);
        }
    }

    overrides
}

// ============ Progress Callback Implementation ============

/// indicatif-backed progress display
struct BarProgress {
    bar: ProgressBar,
    mode: OutputMode,
}

impl BarProgress {
    fn new(mode: OutputMode) -> Self {
        let bar = if mode.should_show(OutputMode::Normal) {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template("{prefix:>12.bold} [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { bar, mode }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for BarProgress {
    fn on_stage(&self, stage: ProcessingStage, total: usize) {
        self.bar.set_prefix(stage.name());
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    fn on_progress(&self, current: usize, _total: usize) {
        self.bar.set_position(current as u64);
    }

    fn on_stage_complete(&self, stage: ProcessingStage, message: &str) {
        if self.mode.should_show(OutputMode::Verbose) {
            self.bar.println(format!("  {}: {}", stage, message));
        }
    }
}

// ============ Extract Command ============

fn run_extract(args: &ExtractArgs, config: &Config, mode: OutputMode) -> anyhow::Result<i32> {
    if !args.input.exists() {
        eprintln!("Error: Input image does not exist: {}", args.input.display());
        return Ok(exit_codes::INPUT_NOT_FOUND);
    }

    let config = config.merge_with_cli(&create_cli_overrides(Some(&args.card), None));
    let start_time = Instant::now();

    let outcome = extract_card(&args.input, &args.output, &config, args.debug, mode)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if mode.should_show(OutputMode::Normal) {
        print_outcome(&outcome, &args.output);
        if mode.should_show(OutputMode::Verbose) {
            println!("Time: {:.2}s", start_time.elapsed().as_secs_f64());
        }
    }

    Ok(outcome_exit_code(&outcome))
}

fn extract_card(
    input: &Path,
    output: &Path,
    config: &Config,
    debug: bool,
    mode: OutputMode,
) -> anyhow::Result<ExtractionOutcome> {
    let progress = BarProgress::new(mode);
    let result = CardExtractor::new(config.card.clone())
        .extract_file_with_progress(input, output, debug, &progress);
    progress.finish();
    result.with_context(|| format!("failed to extract card from {}", input.display()))
}

fn print_outcome(outcome: &ExtractionOutcome, output: &Path) {
    match outcome {
        ExtractionOutcome::Found { region, detector } => {
            println!(
                "Card {} ({} detector) -> {}",
                region.bounds,
                detector,
                output.display()
            );
        }
        ExtractionOutcome::Degraded { width, height } => {
            println!(
                "No content region found; wrote upscaled source {}x{} -> {}",
                width,
                height,
                output.display()
            );
        }
    }
}

fn outcome_exit_code(outcome: &ExtractionOutcome) -> i32 {
    if outcome.is_found() {
        exit_codes::SUCCESS
    } else {
        exit_codes::DEGRADED
    }
}

// ============ Stitch Command ============

fn run_stitch(args: &StitchArgs, config: &Config, mode: OutputMode) -> anyhow::Result<i32> {
    if !args.pdf.exists() {
        eprintln!("Error: Input PDF does not exist: {}", args.pdf.display());
        return Ok(exit_codes::INPUT_NOT_FOUND);
    }

    let config = config.merge_with_cli(&create_cli_overrides(None, Some(&args.stitch)));
    let combined = stitch_document(&args.pdf, &args.output_dir, &config, mode)?;

    if mode.should_show(OutputMode::Normal) {
        println!("Combined image: {}", combined.display());
    }
    Ok(exit_codes::SUCCESS)
}

fn stitch_document(
    pdf: &Path,
    output_dir: &Path,
    config: &Config,
    mode: OutputMode,
) -> anyhow::Result<PathBuf> {
    let start_time = Instant::now();
    let rasterizer = PdftoppmRasterizer::locate()?;
    let stitcher = PageStitcher::new(config.stitch.clone());
    let progress = BarProgress::new(mode);

    let result = stitcher.stitch_pdf(pdf, output_dir, &rasterizer, &progress);
    progress.finish();
    let combined = result.with_context(|| format!("failed to stitch {}", pdf.display()))?;

    if mode.should_show(OutputMode::Verbose) {
        println!("Stitch time: {:.2}s", start_time.elapsed().as_secs_f64());
    }
    Ok(combined)
}

// ============ Run Command ============

fn run_pipeline(args: &RunArgs, config: &Config, mode: OutputMode) -> anyhow::Result<i32> {
    if !args.pdf.exists() {
        eprintln!("Error: Input PDF does not exist: {}", args.pdf.display());
        return Ok(exit_codes::INPUT_NOT_FOUND);
    }

    let config =
        config.merge_with_cli(&create_cli_overrides(Some(&args.card), Some(&args.stitch)));
    let combined = stitch_document(&args.pdf, &args.output_dir, &config, mode)?;

    let card_path = args.output_dir.join(RUN_CARD_FILE);
    let outcome = extract_card(&combined, &card_path, &config, args.debug, mode)?;

    if mode.should_show(OutputMode::Normal) {
        println!("Combined image: {}", combined.display());
        print_outcome(&outcome, &card_path);
    }
    Ok(outcome_exit_code(&outcome))
}

// ============ Info Command ============

fn run_info(config: &Config) -> anyhow::Result<i32> {
    println!("card-extract v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("System Information:");
    println!("  Platform: {}", std::env::consts::OS);
    println!("  Arch: {}", std::env::consts::ARCH);
    println!("  CPUs: {}", num_cpus::get());

    println!();
    println!("PDF Rasterizer:");
    match which::which(card_extract::stitch::rasterize::PDFTOPPM) {
        Ok(path) => println!("  Poppler pdftoppm: {} (found)", path.display()),
        Err(_) => println!("  Poppler pdftoppm: Not found"),
    }

    println!();
    println!("Config File Locations:");
    println!("  Local: ./{}", card_extract::config::LOCAL_CONFIG_FILE);
    if let Some(path) = Config::user_config_path() {
        println!("  User:  {}", path.display());
    }

    println!();
    println!("Effective Configuration:");
    for line in config.to_toml()?.lines() {
        println!("  {}", line);
    }

    Ok(exit_codes::SUCCESS)
}
