//! ThumbMill CLI - Batch Thumbnail Generator
//!
//! Converts a directory of images into width-bounded thumbnails with a
//! bounded number of concurrent workers and live progress reporting.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use thumbmill::{
    default_concurrency, discover_sources, items_from_paths, CancelToken, Config, ProgressUpdate,
    RunConfig, RunResult, ThumbnailPipeline,
};

/// ThumbMill - Batch Thumbnail Generator
#[derive(Parser)]
#[command(
    name = "thumbmill",
    version,
    about = "Batch thumbnail generator with bounded concurrency",
    long_about = "ThumbMill converts a directory of static raster images into width-bounded \
                  thumbnails. Work is dispatched through a fixed-size worker pool, so large \
                  batches run with controlled parallelism and predictable memory use.",
    arg_required_else_help = false
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Source directory of images
    #[arg(short, long, value_name = "DIR")]
    input: Option<PathBuf>,

    /// Output directory for thumbnails
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Maximum thumbnail width in pixels [default: 320]
    #[arg(short, long, value_name = "PIXELS")]
    width: Option<u32>,

    /// JPEG output quality, 1-100 [default: 90]
    #[arg(short, long, value_name = "QUALITY")]
    quality: Option<u8>,

    /// Maximum concurrent workers [default: auto-detect]
    #[arg(short, long, value_name = "COUNT")]
    concurrency: Option<usize>,

    /// Recurse into subdirectories
    #[arg(short = 'R', long)]
    recursive: bool,

    /// Configuration file path (.toml or .yaml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// List what would be processed without processing
    #[arg(long)]
    dry_run: bool,

    /// Output the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'Q', long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Show system information and capabilities
    Info,
    /// Generate an example configuration file
    ExampleConfig {
        /// Output file path
        #[arg(short, long, default_value = "thumbmill.toml")]
        output: PathBuf,
        /// Use YAML format instead of TOML
        #[arg(long)]
        yaml: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    std::env::set_var("RUST_LOG", log_level);

    // Handle subcommands
    if let Some(command) = cli.command {
        if let Err(e) = handle_subcommand(command) {
            eprintln!("{}: {:#}", style("Error").red().bold(), e);
            process::exit(1);
        }
        return;
    }

    if let Err(e) = thumbmill::init() {
        eprintln!(
            "{}: Failed to initialize ThumbMill: {}",
            style("Error").red().bold(),
            e
        );
        process::exit(1);
    }

    let run_config = match build_run_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {:#}", style("Error").red().bold(), e);
            eprintln!("Run with --help for usage information");
            process::exit(1);
        }
    };

    match run_batch(&cli, run_config).await {
        Ok(Some(result)) => print_summary(&result, cli.json),
        Ok(None) => {} // dry run
        Err(e) => {
            eprintln!("{}: {:#}", style("Error").red().bold(), e);
            process::exit(1);
        }
    }
}

/// Handle subcommands
fn handle_subcommand(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Info => show_system_info(),
        Commands::ExampleConfig { output, yaml } => generate_example_config(&output, yaml)?,
    }
    Ok(())
}

/// Assemble the effective run configuration from file and flags.
///
/// A config file provides the baseline; explicit CLI flags win.
fn build_run_config(cli: &Cli) -> anyhow::Result<RunConfig> {
    let mut run = if let Some(ref config_path) = cli.config {
        let config = Config::from_file(config_path)
            .with_context(|| format!("failed to load configuration from {:?}", config_path))?;
        info!("Loaded configuration from: {:?}", config_path);
        config.run
    } else {
        RunConfig::default()
    };

    if let Some(ref input) = cli.input {
        run.source_dir = input.clone();
    }
    if let Some(ref output) = cli.output {
        run.dest_dir = output.clone();
    }
    if let Some(width) = cli.width {
        run.max_width = width;
    }
    if let Some(quality) = cli.quality {
        run.quality = quality;
    }
    if let Some(concurrency) = cli.concurrency {
        run.concurrency = concurrency;
    }
    if cli.recursive {
        run.recursive = true;
    }

    if run.source_dir.as_os_str().is_empty() || run.dest_dir.as_os_str().is_empty() {
        anyhow::bail!("input and output directories are required (--input, --output)");
    }

    Ok(run)
}

/// Run one batch; returns None for a dry run
async fn run_batch(cli: &Cli, run_config: RunConfig) -> anyhow::Result<Option<RunResult>> {
    info!("Input: {:?}", run_config.source_dir);
    info!("Output: {:?}", run_config.dest_dir);
    info!("Max width: {}px", run_config.max_width);

    let sources = discover_sources(&run_config.source_dir, run_config.recursive)
        .context("source discovery failed")?;

    if sources.is_empty() {
        anyhow::bail!(
            "no supported images found in {}",
            run_config.source_dir.display()
        );
    }

    info!("Found {} images to process", sources.len());

    if cli.dry_run {
        println!("{} files would be processed:", style(sources.len()).bold());
        for file in &sources {
            println!("  {}", file.display());
        }
        return Ok(None);
    }

    let items = items_from_paths(sources);
    let pipeline = ThumbnailPipeline::new(run_config);

    // Ctrl-C stops admitting new items; in-flight ones finish
    let cancel = CancelToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, abandoning un-started items");
            interrupt.cancel();
        }
    });

    // Drive the progress bar from the aggregator's event stream
    let reporter = if !cli.json && !cli.quiet {
        let pb = ProgressBar::new(items.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({per_sec}, {eta}) {msg}",
                )?
                .progress_chars("#>-"),
        );

        let mut receiver = pipeline.progress().subscribe();
        let bar = pb.clone();
        Some((
            pb,
            tokio::spawn(async move {
                while let Ok(update) = receiver.recv().await {
                    match update {
                        ProgressUpdate::Started { .. } => {}
                        ProgressUpdate::ItemStarted { file_name } => bar.set_message(file_name),
                        ProgressUpdate::ItemFinished { .. } => bar.inc(1),
                        ProgressUpdate::BatchCompleted { .. } => break,
                    }
                }
            }),
        ))
    } else {
        None
    };

    let result = pipeline
        .run(&items, &cancel)
        .await
        .context("batch processing failed")?;

    if let Some((pb, task)) = reporter {
        let _ = task.await;
        pb.finish_with_message("Processing complete");
    }

    Ok(Some(result))
}

/// Print the run summary
fn print_summary(result: &RunResult, json_output: bool) {
    if json_output {
        match serde_json::to_string_pretty(result) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("{}: JSON serialization failed: {}", style("Error").red(), e),
        }
        return;
    }

    println!();
    println!("{}", style("Processing Summary:").bold());
    println!("  {}: {}", style("Processed").green(), result.succeeded);
    if !result.failed.is_empty() {
        println!("  {}: {}", style("Failed").red(), result.failed.len());
    }
    println!(
        "  {}: {:.2}s",
        style("Duration").blue(),
        result.elapsed.as_secs_f64()
    );

    if result.succeeded > 0 {
        let files_per_second = result.succeeded as f64 / result.elapsed.as_secs_f64().max(1e-9);
        println!("  {}: {:.1} files/sec", style("Speed").cyan(), files_per_second);
    }

    if !result.failed.is_empty() {
        println!();
        println!("{}", style("Failures:").bold());
        for failure in &result.failed {
            println!(
                "  {}: {}",
                style(failure.source_path.display()).yellow(),
                failure.message
            );
        }
    }
}

/// Show system information
fn show_system_info() {
    use sysinfo::{CpuExt, System, SystemExt};

    println!("{}", style("ThumbMill System Information").bold());
    println!();

    println!("{}: {}", style("Version").bold(), env!("CARGO_PKG_VERSION"));
    println!();

    let mut system = System::new_all();
    system.refresh_all();

    println!("{}", style("System:").bold());
    if let Some(name) = system.name() {
        println!("  OS: {}", name);
    }
    println!("  CPUs: {}", system.cpus().len());
    if let Some(cpu) = system.cpus().first() {
        println!("  CPU: {} ({:.2} GHz)", cpu.brand(), cpu.frequency() as f64 / 1000.0);
    }
    println!(
        "  Memory: {:.2} GB total, {:.2} GB available",
        system.total_memory() as f64 / 1024.0 / 1024.0 / 1024.0,
        system.available_memory() as f64 / 1024.0 / 1024.0 / 1024.0
    );
    println!();

    println!("{}", style("Supported Formats:").bold());
    println!("  Input: JPEG, PNG, WebP, TIFF, BMP (static raster only)");
    println!("  Output: follows the source filename extension");
    println!();

    println!("{}", style("Defaults:").bold());
    println!("  Concurrency: {}", default_concurrency());
    println!("  Max width: 320px, JPEG quality: 90");
}

/// Generate example configuration file
fn generate_example_config(output_path: &std::path::Path, use_yaml: bool) -> anyhow::Result<()> {
    let output_path = if use_yaml && output_path == std::path::Path::new("thumbmill.toml") {
        PathBuf::from("thumbmill.yaml")
    } else {
        output_path.to_path_buf()
    };

    let config = Config::default();
    config
        .to_file(&output_path)
        .context("failed to write example configuration")?;

    let format = if use_yaml { "YAML" } else { "TOML" };
    println!(
        "{}: Generated example {} configuration: {}",
        style("Success").green().bold(),
        format,
        output_path.display()
    );

    Ok(())
}
