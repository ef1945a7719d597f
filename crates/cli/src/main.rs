//! SlumpDoD CLI - pre-disturbance terrain, DEM of Difference and volume statistics

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use slumpdod_core::io::read_geotiff;
use slumpdod_core::Raster;
use slumpdod_pipeline::{
    format_elapsed, mismatches, DatasetReport, FeatureOutcome, IdField, Pipeline, PipelineConfig,
    PolygonDataset, RunObserver, SurfaceMethod,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "slumpdod")]
#[command(
    author,
    version,
    about = "Pre-disturbance DEM reconstruction and DEM of Difference statistics",
    long_about = None
)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true, env = "SLUMPDOD_VERBOSE")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a DEM
    Info {
        /// Input DEM file
        #[arg(long, env = "SLUMPDOD_DEM")]
        dem: PathBuf,
    },
    /// Run the batch over every dataset in the workspace
    Run(RunArgs),
    /// Load and validate the DEM and all datasets without processing
    Validate(RunArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum Method {
    NaturalNeighbor,
    Linear,
}

impl From<Method> for SurfaceMethod {
    fn from(m: Method) -> Self {
        match m {
            Method::NaturalNeighbor => SurfaceMethod::NaturalNeighbor,
            Method::Linear => SurfaceMethod::Linear,
        }
    }
}

#[derive(Args)]
struct RunArgs {
    /// Workspace directory holding the polygon datasets; outputs go below it
    #[arg(short, long, env = "SLUMPDOD_WORKSPACE")]
    workspace: PathBuf,
    /// Elevation raster (GeoTIFF)
    #[arg(short, long, env = "SLUMPDOD_DEM")]
    dem: PathBuf,
    /// Output cell size in map units (defaults to the DEM's)
    #[arg(long, env = "SLUMPDOD_CELL_SIZE")]
    cell_size: Option<f64>,
    /// Identifier attribute name
    #[arg(long, env = "SLUMPDOD_ID_FIELD", conflicts_with = "id_index")]
    id_field: Option<String>,
    /// Identifier attribute position in property order
    #[arg(long, env = "SLUMPDOD_ID_INDEX")]
    id_index: Option<usize>,
    /// Buffer radius around each footprint, in map units
    #[arg(short, long, default_value = "50", env = "SLUMPDOD_BUFFER")]
    buffer: f64,
    /// Skip squared DoDs and RMSE tables
    #[arg(long, env = "SLUMPDOD_NO_RMSE")]
    no_rmse: bool,
    /// Surface interpolation method
    #[arg(short, long, value_enum, default_value = "natural-neighbor", env = "SLUMPDOD_METHOD")]
    method: Method,
    /// Dataset file to process (repeatable); default is every *.geojson in the workspace
    #[arg(long = "dataset", env = "SLUMPDOD_DATASETS", value_delimiter = ',')]
    datasets: Vec<PathBuf>,
    /// Write per-feature rasters (clip, pre-disturbance, DoD)
    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        env = "SLUMPDOD_KEEP_INTERMEDIATES"
    )]
    keep_intermediates: bool,
}

impl RunArgs {
    fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.workspace, self.dem);
        config.cell_size = self.cell_size;
        config.id_field = match (self.id_field, self.id_index) {
            (_, Some(index)) => IdField::Index(index),
            (Some(name), None) => IdField::Name(name),
            (None, None) => IdField::default(),
        };
        config.buffer_distance = self.buffer;
        config.rmse = !self.no_rmse;
        config.method = self.method.into();
        config.datasets = self.datasets;
        config.keep_intermediates = self.keep_intermediates;
        config
    }
}

// ─── Progress ───────────────────────────────────────────────────────────

/// One progress bar per dataset
#[derive(Default)]
struct ProgressObserver {
    bar: Option<ProgressBar>,
}

impl RunObserver for ProgressObserver {
    fn dataset_started(&mut self, dataset: &PolygonDataset) {
        let pb = ProgressBar::new(dataset.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {prefix} [{bar:30}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb.set_prefix(dataset.name().to_string());
        self.bar = Some(pb);
    }

    fn feature_finished(&mut self, outcome: &FeatureOutcome) {
        if let Some(pb) = &self.bar {
            let status = if outcome.is_processed() {
                "done"
            } else {
                "skipped"
            };
            pb.set_message(format!("feature {} {}", outcome.id(), status));
            pb.inc(1);
        }
    }

    fn dataset_finished(&mut self, report: &DatasetReport) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
        println!(
            "{}: {} processed, {} skipped",
            report.name,
            report.processed.len(),
            report.skipped.len()
        );
        for skip in &report.skipped {
            println!("  feature {} skipped: {}", skip.id, skip.reason);
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_dem(path: &PathBuf) -> Result<Raster<f64>> {
    let pb = spinner("Reading DEM...");
    let raster: Raster<f64> = read_geotiff(path).context("Failed to read DEM")?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn open_pipeline(args: RunArgs) -> Result<Pipeline> {
    let pb = spinner("Reading DEM...");
    let pipeline = Pipeline::new(args.into_config()).context("Invalid configuration")?;
    pb.finish_and_clear();
    Ok(pipeline)
}

fn done(name: &str, path: &std::path::Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {}", format_elapsed(elapsed));
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { dem } => {
            let raster = read_dem(&dem)?;
            let (rows, cols) = raster.shape();
            let extent = raster.extent();
            let stats = raster.statistics();

            println!("File: {}", dem.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!("Extent: {}", extent);
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
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
            if let Some(std_dev) = stats.std_dev {
                println!("  Std dev: {:.4}", std_dev);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        // ── Validate ─────────────────────────────────────────────────
        Commands::Validate(args) => {
            let pipeline = open_pipeline(args)?;
            let datasets = pipeline.load_datasets().context("Invalid dataset")?;
            println!(
                "DEM: {} ({} x {}, cell size {})",
                pipeline.config().dem.display(),
                pipeline.dem().cols(),
                pipeline.dem().rows(),
                pipeline.cell_size()
            );
            for ds in &datasets {
                println!(
                    "{}: {} features, identifier '{}' ({})",
                    ds.name(),
                    ds.len(),
                    ds.id_field(),
                    ds.path().display()
                );
            }
            println!("Configuration OK");
        }

        // ── Run ──────────────────────────────────────────────────────
        Commands::Run(args) => {
            let pipeline = open_pipeline(args)?;
            let start = Instant::now();
            let mut observer = ProgressObserver::default();
            let summary = pipeline
                .run_with_observer(&mut observer)
                .context("Batch failed")?;
            let elapsed = start.elapsed();

            for rec in mismatches(&summary.reconciliation) {
                warn!("{}: {} of {} features merged", rec.table, rec.merged, rec.expected);
            }
            println!(
                "{} of {} features processed, {} skipped",
                summary.processed,
                summary.feature_count(),
                summary.skipped
            );
            done("Statistics", &summary.merged_zonal_table, elapsed);
            if let Some(path) = &summary.merged_rmse_table {
                println!("RMSE saved to: {}", path.display());
            }
            println!("Summary saved to: {}", pipeline.layout().summary_path().display());

            if summary.processed == 0 && summary.feature_count() > 0 {
                bail!("no feature could be processed");
            }
        }
    }

    Ok(())
}
