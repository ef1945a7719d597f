//! Batch driver
//!
//! Runs the stages for every feature of every dataset, strictly in order,
//! then merges the per-feature tables per dataset and across the batch.

use slumpdod_core::io::read_geotiff;
use slumpdod_core::Raster;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::dataset::{discover_datasets, FeatureId, FeatureRecord, PolygonDataset};
use crate::error::{PipelineError, Result, SkipReason};
use crate::merge::{merge_files, reconcile, Reconciliation};
use crate::paths::{FeatureArtifact, OutputLayout, TableKind};
use crate::report::{
    format_elapsed, DatasetReport, FeatureOutcome, FeatureReport, RunSummary, SkippedFeature,
};
use crate::selection::FeatureFilter;
use crate::stages;
use crate::table::StatisticsTable;

/// Progress callbacks for a batch run
pub trait RunObserver {
    fn dataset_started(&mut self, _dataset: &PolygonDataset) {}
    fn feature_finished(&mut self, _outcome: &FeatureOutcome) {}
    fn dataset_finished(&mut self, _report: &DatasetReport) {}
}

/// Observer that ignores every event
#[derive(Debug, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Split an engine result into a value, a skip, or a fatal error.
fn classify<T>(result: slumpdod_core::Result<T>) -> Result<std::result::Result<T, SkipReason>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(err) => match SkipReason::from_engine(&err) {
            Some(reason) => Ok(Err(reason)),
            None => Err(err.into()),
        },
    }
}

macro_rules! or_skip {
    ($id:expr, $result:expr) => {
        match classify($result)? {
            Ok(value) => value,
            Err(reason) => return Ok(skipped($id, reason)),
        }
    };
}

fn skipped(id: FeatureId, reason: SkipReason) -> FeatureOutcome {
    FeatureOutcome::Skipped(SkippedFeature { id, reason })
}

/// A configured batch over one DEM
pub struct Pipeline {
    config: PipelineConfig,
    layout: OutputLayout,
    dem: Raster<f64>,
    cell_size: f64,
}

impl Pipeline {
    /// Validate the configuration and load the DEM.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let start = Instant::now();
        let dem: Raster<f64> = read_geotiff(&config.dem).map_err(|e| {
            PipelineError::config(format!("cannot read DEM {}: {}", config.dem.display(), e))
        })?;
        let cell_size = config.check_dem(&dem)?;
        info!(
            "DEM {}: {} x {} cells of {} m in {:.2?}",
            config.dem.display(),
            dem.cols(),
            dem.rows(),
            cell_size,
            start.elapsed()
        );

        Ok(Self {
            layout: OutputLayout::new(config.output_root()),
            config,
            dem,
            cell_size,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn dem(&self) -> &Raster<f64> {
        &self.dem
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Load and validate every dataset before any processing.
    pub fn load_datasets(&self) -> Result<Vec<PolygonDataset>> {
        let paths = if self.config.datasets.is_empty() {
            discover_datasets(&self.config.workspace)?
        } else {
            self.config.datasets.clone()
        };
        if paths.is_empty() {
            return Err(PipelineError::config(format!(
                "no *.geojson datasets in {}",
                self.config.workspace.display()
            )));
        }

        let mut names = HashSet::new();
        let mut datasets = Vec::with_capacity(paths.len());
        for path in paths {
            let dataset = PolygonDataset::load(&path, &self.config.id_field)?;
            if !names.insert(dataset.name().to_string()) {
                return Err(PipelineError::config(format!(
                    "two datasets are named '{}'",
                    dataset.name()
                )));
            }
            if dataset.is_empty() {
                warn!("{}: dataset has no features", dataset.name());
            }
            info!(
                "{}: {} features, identifier '{}'",
                dataset.name(),
                dataset.len(),
                dataset.id_field()
            );
            datasets.push(dataset);
        }
        Ok(datasets)
    }

    pub fn run(&self) -> Result<RunSummary> {
        self.run_with_observer(&mut NoopObserver)
    }

    /// Process every dataset, merge across the batch and write the run summary.
    pub fn run_with_observer(&self, observer: &mut dyn RunObserver) -> Result<RunSummary> {
        let start = Instant::now();
        let datasets = self.load_datasets()?;

        let mut reports = Vec::with_capacity(datasets.len());
        for dataset in &datasets {
            reports.push(self.process_dataset(dataset, observer)?);
        }

        let expected: usize = datasets.iter().map(PolygonDataset::len).sum();
        let mut reconciliation = Vec::new();

        let zonal_paths: Vec<PathBuf> = reports.iter().map(|r| r.zonal_table.clone()).collect();
        let merged_zonal_table = self.layout.merged_table_path(TableKind::Zonal);
        let merged = merge_files(&zonal_paths)?;
        merged.write_csv(&merged_zonal_table)?;
        reconciliation.push(reconcile("FinalStatistics_merged", expected, merged.len()));

        let merged_rmse_table = if self.config.rmse {
            let rmse_paths: Vec<PathBuf> =
                reports.iter().filter_map(|r| r.rmse_table.clone()).collect();
            let path = self.layout.merged_table_path(TableKind::Rmse);
            let merged = merge_files(&rmse_paths)?;
            merged.write_csv(&path)?;
            reconciliation.push(reconcile("FinalRMSE_merged", expected, merged.len()));
            Some(path)
        } else {
            None
        };

        let processed = reports.iter().map(|r| r.processed.len()).sum();
        let skipped = reports.iter().map(|r| r.skipped.len()).sum();
        let elapsed = start.elapsed();

        let summary = RunSummary {
            config: self.config.clone(),
            cell_size: self.cell_size,
            datasets: reports,
            merged_zonal_table,
            merged_rmse_table,
            reconciliation,
            processed,
            skipped,
            elapsed_secs: elapsed.as_secs_f64(),
        };
        summary.write(self.layout.summary_path())?;

        info!(
            "Batch finished: {} processed, {} skipped in {}",
            processed,
            skipped,
            format_elapsed(elapsed)
        );
        Ok(summary)
    }

    /// Run every stage for one dataset and merge its tables.
    pub fn process_dataset(
        &self,
        dataset: &PolygonDataset,
        observer: &mut dyn RunObserver,
    ) -> Result<DatasetReport> {
        let start = Instant::now();
        let name = dataset.name();
        observer.dataset_started(dataset);
        self.layout
            .prepare_dataset(name, self.config.rmse, self.config.keep_intermediates)?;

        let (buffered, _) =
            stages::buffer_dataset(dataset, self.config.buffer_distance, &self.layout)?;

        let mut processed = Vec::new();
        let mut skipped = Vec::new();
        for buffer in &buffered {
            let footprint = dataset
                .select(FeatureFilter::IdEquals(buffer.id))
                .next()
                .ok_or_else(|| {
                    PipelineError::config(format!("{}: no feature {}", name, buffer.id))
                })?;

            let outcome = self.process_feature(name, buffer, footprint)?;
            observer.feature_finished(&outcome);
            match outcome {
                FeatureOutcome::Processed(report) => processed.push(*report),
                FeatureOutcome::Skipped(skip) => {
                    warn!("{}: feature {} skipped: {}", name, skip.id, skip.reason);
                    skipped.push(skip);
                }
            }
        }

        let ids: Vec<FeatureId> = processed.iter().map(|r: &FeatureReport| r.id).collect();
        let mut reconciliation = Vec::new();

        let (zonal_table, merged_rows) = self.merge_dataset(name, TableKind::Zonal, &ids)?;
        let table = format!("{}_FinalStatistics", name);
        reconciliation.push(reconcile(&table, dataset.len(), merged_rows));

        let rmse_table = if self.config.rmse {
            let (path, merged_rows) = self.merge_dataset(name, TableKind::Rmse, &ids)?;
            let table = format!("{}_FinalRMSE", name);
            reconciliation.push(reconcile(&table, dataset.len(), merged_rows));
            Some(path)
        } else {
            None
        };

        let report = DatasetReport {
            name: name.to_string(),
            source: dataset.path().to_path_buf(),
            feature_count: dataset.len(),
            processed,
            skipped,
            zonal_table,
            rmse_table,
            reconciliation,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        info!(
            "{}: {} processed, {} skipped in {}",
            name,
            report.processed.len(),
            report.skipped.len(),
            format_elapsed(start.elapsed())
        );
        observer.dataset_finished(&report);
        Ok(report)
    }

    /// Merge the per-feature tables of `ids` into the dataset table.
    ///
    /// Returns the table's path and row count.
    fn merge_dataset(
        &self,
        dataset: &str,
        kind: TableKind,
        ids: &[FeatureId],
    ) -> Result<(PathBuf, usize)> {
        let paths: Vec<PathBuf> = ids
            .iter()
            .map(|&id| self.layout.feature_path(kind.feature_artifact(), dataset, id))
            .collect();
        let merged = merge_files(&paths)?;
        let merged = if merged.columns().is_empty() {
            // No processed feature: header-only table
            match kind {
                TableKind::Zonal => StatisticsTable::new(crate::table::ZONAL_COLUMNS),
                TableKind::Rmse => StatisticsTable::new(crate::table::RMSE_COLUMNS),
            }
        } else {
            merged
        };

        let out = self.layout.dataset_table_path(kind, dataset);
        merged.write_csv(&out)?;
        Ok((out, merged.len()))
    }

    /// Run the per-feature stages for one buffered feature.
    ///
    /// Geometric failures yield [`FeatureOutcome::Skipped`]; anything else
    /// is returned as an error and stops the batch.
    pub fn process_feature(
        &self,
        dataset: &str,
        buffered: &FeatureRecord,
        footprint: &FeatureRecord,
    ) -> Result<FeatureOutcome> {
        let start = Instant::now();
        let id = buffered.id;
        let keep = self.config.keep_intermediates;
        let path = |artifact| self.layout.feature_path(artifact, dataset, id);

        let clip = or_skip!(id, stages::extract(&self.dem, buffered));
        if clip.raster.valid_count() == 0 {
            return Ok(skipped(id, SkipReason::EmptyPointCloud));
        }
        if keep {
            stages::write_raster(&clip.raster, &path(FeatureArtifact::ClippedDem))?;
        }

        let donors = stages::mask(&clip.raster, footprint)?;
        let surface = or_skip!(
            id,
            stages::reconstruct(id, &donors, &clip.raster, self.config.method)
        );
        let donor_count = donors.len();
        drop(donors);
        if keep {
            stages::write_raster(&surface.surface, &path(FeatureArtifact::Predisturbance))?;
        }

        let dod = stages::dem_of_difference(id, &clip.raster, &surface.surface)?;
        if keep {
            stages::write_raster(&dod, &path(FeatureArtifact::Dod))?;
        }

        let Some(aggregates) = stages::aggregate(&dod, footprint, self.config.rmse)? else {
            return Ok(skipped(id, SkipReason::EmptyZone));
        };

        StatisticsTable::from_zonal(dataset, id, &aggregates.zonal)
            .write_csv(path(FeatureArtifact::ZonalTable))?;

        let rmse = match &aggregates.squared {
            Some((squared, mean)) => {
                if keep {
                    stages::write_raster(squared, &path(FeatureArtifact::DodSquared))?;
                }
                StatisticsTable::from_rmse(dataset, id, mean)
                    .write_csv(path(FeatureArtifact::RmseTable))?;
                Some(mean.rmse())
            }
            None => None,
        };

        let elapsed = start.elapsed();
        info!("{}: feature {} done in {:.2?}", dataset, id, elapsed);

        Ok(FeatureOutcome::Processed(Box::new(FeatureReport {
            id,
            coverage: clip.coverage.fraction(),
            donor_count,
            hull_gaps: surface.hull_gaps,
            dod: dod.statistics(),
            zonal: aggregates.zonal,
            rmse,
            elapsed_secs: elapsed.as_secs_f64(),
        })))
    }
}

/// Reconciliation entries that found a mismatch
pub fn mismatches(entries: &[Reconciliation]) -> impl Iterator<Item = &Reconciliation> {
    entries.iter().filter(|r| !r.is_consistent())
}
