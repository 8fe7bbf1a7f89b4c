//! nxgeom: NXmx geometry and virtual dataset metadata from the command line.
//!
//! Reads a JSON description of a collection and prints the derived axes,
//! scan positions, virtual dataset plans and chip block positions as JSON.
#![allow(
    clippy::uninlined_format_args,
    clippy::redundant_closure_for_method_calls,
    clippy::missing_errors_doc,
    clippy::too_many_lines
)]

mod config;
mod report;

use clap::{Parser, Subcommand};
use nxgeom_core::DetectorMode;
use nxgeom_scan::{
    compute_goniometer, fixed_target_scan, parse_chip_map, read_chip_map, ScanDirection,
};
use nxgeom_vds::{
    chunked_datasets, jungfrau_layout, layout, plan, total_capacity, unused_datasets,
    BackingDataset, DataType, LayoutSink, MAX_FRAMES_PER_DATASET,
};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use config::Config;
use report::{AxisReport, ChipReport, DetectorReport, GeometryReport, JsonSink, PlanReport};

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Geometry error: {0}")]
    Core(#[from] nxgeom_core::Error),

    #[error("Scan error: {0}")]
    Scan(#[from] nxgeom_scan::Error),

    #[error("Dataset error: {0}")]
    Vds(#[from] nxgeom_vds::Error),

    #[error("{0}")]
    Usage(String),
}

/// NXmx geometry, scan and virtual dataset metadata.
#[derive(Parser)]
#[command(name = "nxgeom")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug diagnostics (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate goniometer and detector axes and print them in McStas coordinates
    Geometry {
        /// Collection description (JSON)
        config: PathBuf,
    },

    /// Print the oscillation and grid scan positions
    Scan {
        /// Collection description (JSON)
        config: PathBuf,

        /// Scan in the negative direction
        #[arg(long)]
        reverse: bool,

        /// Only print the rotation range, as for an event-mode detector
        #[arg(long)]
        event_mode: bool,

        /// End of the rotation range in event mode
        #[arg(long, allow_hyphen_values = true)]
        end_position: Option<f64>,
    },

    /// Plan a virtual dataset over chunked backing datasets
    Plan {
        /// Collection description listing the backing datasets
        #[arg(long)]
        config: Option<PathBuf>,

        /// Total frames written by the detector
        #[arg(short = 'n', long, required_unless_present = "config")]
        frames: Option<usize>,

        /// Maximum frames per backing dataset
        #[arg(long, default_value_t = MAX_FRAMES_PER_DATASET)]
        max_frames: usize,

        /// Backing dataset name prefix
        #[arg(long, default_value = "data")]
        prefix: String,

        /// First frame of the virtual dataset
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        start: i64,

        /// Frames in the virtual dataset (default: up to the last frame)
        #[arg(long)]
        count: Option<usize>,

        /// Element type of the frames
        #[arg(long, default_value = "uint16")]
        dtype: DataType,

        /// Tile two Jungfrau 1M modules into one image instead of
        /// concatenating frames
        #[arg(long)]
        jungfrau: bool,
    },

    /// Print start and end positions of the scanned chip blocks
    Chip {
        /// Collection description (JSON)
        config: PathBuf,

        /// Chip map file selecting the blocks to scan
        #[arg(long)]
        map: Option<PathBuf>,

        /// Also print the window-by-window goniometer positions
        #[arg(long)]
        scan: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn jungfrau_plan(
    config: Option<PathBuf>,
    frames: Option<usize>,
    prefix: &str,
    dtype: DataType,
) -> Result<()> {
    let modules = match config {
        Some(path) => Config::from_file(&path)?.datasets.ok_or_else(|| {
            CliError::Usage(format!("{} has no datasets section", path.display()))
        })?,
        None => {
            let frames = frames.ok_or_else(|| {
                CliError::Usage("--jungfrau needs --frames or --config".into())
            })?;
            (1..=2)
                .map(|i| BackingDataset::new(format!("{prefix}_{i:06}"), frames))
                .collect()
        }
    };
    let frames = modules.iter().map(|m| m.capacity).min().unwrap_or(0);
    let names: Vec<&str> = modules.iter().map(|m| m.name.as_str()).collect();
    let layout = jungfrau_layout(&names, frames, dtype)?;
    log::info!("tiled layout of {} bytes", layout.nbytes());

    let mut sink = JsonSink::default();
    sink.materialize_tiled(&layout)?;
    print_json(&sink.take())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Geometry { config } => {
            let config = Config::from_file(&config)?;
            let goniometer = config.goniometer.to_mcstas(&config.convention);
            let detector = config
                .detector
                .as_ref()
                .map(|d| d.to_mcstas(&config.convention));

            let report = GeometryReport {
                convention: config.convention.name(),
                scan_axis: goniometer.oscillation_axis()?,
                grid_axes: goniometer.axes().grid_axes()?,
                goniometer: AxisReport::from_chain(goniometer.axes())?,
                detector: detector.as_ref().map(DetectorReport::new).transpose()?,
            };
            print_json(&report)?;
        }

        Commands::Scan {
            config,
            reverse,
            event_mode,
            end_position,
        } => {
            let config = Config::from_file(&config)?;
            let events = event_mode
                || config
                    .detector
                    .as_ref()
                    .is_some_and(|d| d.params.mode == DetectorMode::Events);

            if events {
                log::info!("event-mode collection, recording the rotation range only");
                let scan = config.goniometer.define_event_mode_scan(end_position)?;
                print_json(&scan)?;
            } else {
                if end_position.is_some() {
                    log::warn!("--end-position only applies to event-mode collections");
                }
                let direction = if reverse {
                    ScanDirection::Negative
                } else {
                    ScanDirection::Positive
                };
                let scan = config
                    .goniometer
                    .define_scan(config.grid.as_ref(), direction)?;
                log::info!("{} scan points", scan.oscillation.len());
                print_json(&scan)?;
            }
        }

        Commands::Plan {
            config,
            frames,
            max_frames,
            prefix,
            start,
            count,
            dtype,
            jungfrau,
        } => {
            if jungfrau {
                return jungfrau_plan(config, frames.or(count), &prefix, dtype);
            }
            let datasets = match (config, frames) {
                (Some(path), _) => Config::from_file(&path)?.datasets.ok_or_else(|| {
                    CliError::Usage(format!("{} has no datasets section", path.display()))
                })?,
                (None, Some(frames)) => chunked_datasets(&prefix, frames, max_frames)?,
                (None, None) => {
                    return Err(CliError::Usage(
                        "either --config or --frames is required".into(),
                    ))
                }
            };

            let capacity = total_capacity(&datasets);
            let count = count.unwrap_or_else(|| {
                usize::try_from(start).map_or(0, |s| capacity.saturating_sub(s))
            });
            let fragments = plan(&datasets, start, count)?;
            let unused = unused_datasets(&datasets, start, count)?;
            let layout = layout(&fragments, dtype)?;
            log::info!(
                "{} frames from {} of {} backing datasets",
                layout.len(),
                fragments.len(),
                datasets.len()
            );

            let mut sink = JsonSink::default();
            sink.materialize(&layout)?;
            let report = PlanReport {
                datasets: &datasets,
                fragments: &fragments,
                unused: unused.iter().map(|d| d.name.as_str()).collect(),
                layout: sink.take(),
            };
            print_json(&report)?;
        }

        Commands::Chip { config, map, scan } => {
            let config = Config::from_file(&config)?;
            let setup = config.chip.unwrap_or_default();
            let (x_blocks, y_blocks) = setup.chip.num_blocks;

            let blocks = match map {
                Some(path) => Some(parse_chip_map(&std::fs::read_to_string(path)?)?),
                None => None,
            };
            let chip_map = read_chip_map(blocks.as_deref(), x_blocks, y_blocks)?;

            let axes = config.goniometer.axes();
            let positions = compute_goniometer(&setup.chip, axes, &setup.axes, &chip_map)?;
            let scan = if scan {
                Some(fixed_target_scan(
                    &setup.chip,
                    axes,
                    &setup.axes,
                    &chip_map,
                    setup.exposures,
                )?)
            } else {
                None
            };
            log::info!("{} blocks on {}", positions.blocks.len(), setup.chip.name);

            print_json(&ChipReport {
                chip: &setup.chip,
                positions,
                scan,
            })?;
        }
    }

    Ok(())
}
