//! # SlumpDoD Pipeline
//!
//! Batch estimation of pre-disturbance terrain beneath polygon footprints.
//!
//! For every dataset in the workspace and every feature in it:
//!
//! 1. buffer the footprint and clip the DEM to the buffered extent
//! 2. drop the DEM cells on the footprint, keeping the surrounding donors
//! 3. triangulate the donors and rasterize a pre-disturbance surface
//! 4. subtract it from the DEM (DEM of Difference)
//! 5. aggregate the DoD inside the footprint (area, volume, RMSE)
//!
//! Per-feature tables are then merged per dataset and across the batch.
//!
//! ```no_run
//! use slumpdod_pipeline::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::new("/data/slumps", "/data/slumps/dem.tif");
//! let summary = Pipeline::new(config)?.run()?;
//! println!("{} processed, {} skipped", summary.processed, summary.skipped);
//! # Ok::<(), slumpdod_pipeline::PipelineError>(())
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod merge;
pub mod paths;
pub mod report;
pub mod run;
pub mod selection;
pub mod stages;
pub mod table;

pub use config::{IdField, PipelineConfig};
pub use dataset::{discover_datasets, FeatureId, FeatureRecord, PolygonDataset};
pub use error::{PipelineError, Result, SkipReason};
pub use merge::{merge_files, merge_tables, reconcile, Reconciliation};
pub use paths::{ensure_dir, FeatureArtifact, OutputLayout, TableKind};
pub use report::{
    format_elapsed, DatasetReport, FeatureOutcome, FeatureReport, RunSummary, SkippedFeature,
};
pub use run::{mismatches, NoopObserver, Pipeline, RunObserver};
pub use selection::FeatureFilter;
pub use slumpdod_algorithms::interpolation::SurfaceMethod;
pub use table::StatisticsTable;
