//! nestshed CLI - exclusive contribution areas of nested watersheds

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use nestshed_core::io::read_geotiff;
use nestshed_core::Raster;
use nestshed_pipeline::{Pipeline, PipelineConfig, RunInputs, RunReport};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "nestshed")]
#[command(author, version, about = "Exclusive contribution areas of nested watersheds", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Delineate, rank and difference basins for a set of labelled outlets
    Run {
        /// Elevation GeoTIFF
        #[arg(long)]
        dem: PathBuf,
        /// Outlet coordinates, one `x,y` per line
        #[arg(long)]
        outlets: PathBuf,
        /// Collection-point labels (GeoJSON, or one label per line)
        #[arg(long)]
        points: PathBuf,
        /// JSON configuration file; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Scratch directory for intermediate products
        #[arg(long)]
        scratch: Option<PathBuf>,
        /// Output directory for exclusive areas and the run summary
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        overrides: Overrides,
    },
}

#[derive(clap::Args)]
struct Overrides {
    /// Stream threshold in upstream cells
    #[arg(short, long)]
    threshold: Option<f64>,
    /// MFD convergence factor (1-10)
    #[arg(long)]
    convergence: Option<u32>,
    /// Memory ceiling for flow routing, in megabytes. Routing holds about
    /// 64 bytes per cell, so the default 300 MB fits roughly 2200 x 2200 cells
    #[arg(long)]
    memory_mb: Option<usize>,
    /// Snap outlets to the strongest channel cell within this many cells
    #[arg(long)]
    snap_radius: Option<usize>,
    /// Feature property holding the collection-point label
    #[arg(long)]
    label_field: Option<String>,
    /// Maximum concurrent basin workers
    #[arg(short, long)]
    workers: Option<usize>,
    /// Keep per-basin mask rasters in the scratch directory
    #[arg(long)]
    keep_masks: bool,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_dem(path: &PathBuf) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path).context("Failed to read raster")?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn load_config(
    path: Option<PathBuf>,
    scratch: Option<PathBuf>,
    output: Option<PathBuf>,
    overrides: Overrides,
) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::load(&path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(dir) = scratch {
        config.scratch_dir = dir;
    }
    if let Some(dir) = output {
        config.output_dir = dir;
    }
    if let Some(threshold) = overrides.threshold {
        config.routing.threshold = threshold;
    }
    if let Some(convergence) = overrides.convergence {
        config.routing.convergence = convergence;
    }
    if let Some(memory_mb) = overrides.memory_mb {
        config.routing.memory_mb = memory_mb;
    }
    if let Some(radius) = overrides.snap_radius {
        config.snap_radius = radius;
    }
    if let Some(field) = overrides.label_field {
        config.label_field = field;
    }
    if overrides.workers.is_some() {
        config.workers = overrides.workers;
    }
    config.keep_masks |= overrides.keep_masks;

    Ok(config)
}

fn print_report(report: &RunReport, elapsed: std::time::Duration) {
    println!(
        "{:<24} {:>5} {:>12} {:>14} {:>10}",
        "label", "rank", "min elev", "area", "cells"
    );
    for r in &report.results {
        let area = if r.empty { "empty".to_string() } else { format!("{:.2}", r.area) };
        println!(
            "{:<24} {:>5} {:>12.3} {:>14} {:>10}",
            r.label, r.rank, r.min_elevation, area, r.cell_count
        );
    }
    for f in &report.failures {
        println!("{:<24} failed in {}: {}", f.label, f.stage, f.reason);
    }
    println!(
        "\n{} of {} labels produced an exclusive area",
        report.exclusive, report.submitted
    );
    println!("  Processing time: {:.2?}", elapsed);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_dem(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }

        // ── Run ──────────────────────────────────────────────────────
        Commands::Run {
            dem,
            outlets,
            points,
            config,
            scratch,
            output,
            overrides,
        } => {
            let config = load_config(config, scratch, output, overrides)?;
            let pipeline = Pipeline::new(config).context("Invalid configuration")?;
            let inputs = RunInputs {
                dem,
                outlets,
                collection_points: points,
            };

            let pb = spinner("Computing exclusive contribution areas...");
            let start = Instant::now();
            let result = pipeline.run(&inputs);
            pb.finish_and_clear();
            let report = result.context("Run failed")?;
            let elapsed = start.elapsed();

            print_report(&report, elapsed);
            if !report.is_complete() {
                warn!("{} labels failed; see run_summary.json", report.failures.len());
            }
            println!(
                "Exclusive areas saved to: {}",
                pipeline.config().output_dir.display()
            );
        }
    }

    Ok(())
}
