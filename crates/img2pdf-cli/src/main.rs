//! img2pdf CLI - Command line tool for batching images into a PDF.

use anyhow::{Context, Result};
use clap::Parser;
use img2pdf_core::{AppConfig, InputSelection, PageSize, ProgressSink, convert};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "img2pdf")]
#[command(author, version, about = "Batch images into a single PDF", long_about = None)]
struct Args {
    /// A directory to scan, or image files in the order they should appear
    /// (default: current directory)
    inputs: Vec<PathBuf>,

    /// Output file name (default: output.pdf)
    #[arg(short, long)]
    output: Option<String>,

    /// Output directory (default: current directory)
    #[arg(short = 'd', long, env = "IMG2PDF_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Rewrite the PDF when it is larger than this many MiB (default: 10)
    #[arg(long, env = "IMG2PDF_MAX_SIZE_MB")]
    max_size_mb: Option<u64>,

    /// Wrap the PDF in a ZIP archive
    #[arg(long)]
    archive: bool,

    /// Name of the PDF inside the archive (implies --archive)
    #[arg(long)]
    archive_name: Option<String>,

    /// Page size: letter, legal, a4, a5 or WxH in points
    #[arg(long, value_parser = parse_page_size)]
    page_size: Option<PageSize>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_page_size(value: &str) -> Result<PageSize, String> {
    value.parse().map_err(|e: img2pdf_core::Error| e.to_string())
}

/// Turn the positional arguments into an input selection.
///
/// A single directory is scanned; anything else is an explicit file list.
fn input_selection(inputs: Vec<PathBuf>) -> Result<InputSelection> {
    if inputs.is_empty() {
        return Ok(InputSelection::Directory(PathBuf::from(".")));
    }
    if inputs.len() == 1 && inputs[0].is_dir() {
        return Ok(InputSelection::Directory(inputs[0].clone()));
    }
    if let Some(dir) = inputs.iter().find(|p| p.is_dir()) {
        anyhow::bail!(
            "{} is a directory; pass a single directory or a list of image files",
            dir.display()
        );
    }
    Ok(InputSelection::Files(inputs))
}

/// Progress sink drawing a percentage bar.
struct BarSink(ProgressBar);

impl ProgressSink for BarSink {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn report(&self, fraction: f64) {
        // fraction is in [0, 1]
        self.0.set_position((fraction * 100.0).round() as u64);
    }
}

fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    // Override config with CLI arguments
    if let Some(output) = args.output {
        config.output_name = output;
    }
    if let Some(output_dir) = args.output_dir {
        config.output_dir = Some(output_dir);
    }
    if let Some(max_size_mb) = args.max_size_mb {
        config.max_size_mb = max_size_mb;
    }
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    if args.archive_name.is_some() {
        config.archive_name = args.archive_name;
        config.archive = true;
    }
    if args.archive {
        config.archive = true;
    }

    if args.print_config {
        // CLI output is intentional
        #[allow(clippy::print_stdout)]
        {
            print!("{}", config.to_toml()?);
        }
        return Ok(());
    }

    let inputs = input_selection(args.inputs)?;
    let job = config.job(inputs).context("Invalid configuration")?;
    info!("Writing {}", job.output.display());

    // Setup progress bar
    let pb = ProgressBar::new(100);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );
    let sink = BarSink(pb);

    let result = convert(&job, &sink);
    sink.0.finish_and_clear();
    let report = result.context("Conversion failed")?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!("{}", report.message());
    }

    Ok(())
}
