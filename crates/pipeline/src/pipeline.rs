//! Pipeline orchestration
//!
//! Inputs are read and paired before any geoprocessing. The surface is then
//! routed once and every label goes through delineation, ranking and
//! differencing. Per-label failures are collected; only input errors and
//! broken stage accounting stop the run.

use crate::artifacts::{ArtifactKind, ArtifactRef, ArtifactStore};
use crate::config::PipelineConfig;
use crate::delineate::{BasinDelineator, RasterDelineator};
use crate::difference::{hierarchical_difference, GeoOverlay, Overlay};
use crate::error::{check_accounting, Result, Stage, StageFailure};
use crate::input::{pair_outlets, read_collection_points, read_outlet_coordinates};
use crate::model::{BasinPolygon, CollectionPoint, OutletPoint};
use crate::rank::{rank_basins, RasterZonal, ZonalMinimum};
use crate::report::{LabelResult, RunReport};
use crate::surface::ElevationSurface;
use nestshed_algorithms::hydrology::{max_basin_workers, route_flow};
use nestshed_parallel::{num_cpus, ParallelStrategy, ProcessingMode};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Files a run reads
#[derive(Debug, Clone)]
pub struct RunInputs {
    /// Elevation GeoTIFF
    pub dem: PathBuf,
    /// `x,y` outlet coordinates
    pub outlets: PathBuf,
    /// Collection-point labels, GeoJSON or one label per line
    pub collection_points: PathBuf,
}

/// The services one run goes through
pub struct Stages<'a, D: ?Sized, Z: ?Sized, O: ?Sized> {
    pub delineator: &'a D,
    pub zonal: &'a Z,
    pub overlay: &'a O,
    pub store: &'a ArtifactStore,
    pub mode: ProcessingMode,
}

/// Exclusive contribution area pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Validate `config` and build the pipeline
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run over files on disk
    pub fn run(&self, inputs: &RunInputs) -> Result<RunReport> {
        let coords = read_outlet_coordinates(&inputs.outlets)?;
        let points = read_collection_points(&inputs.collection_points, &self.config.label_field)?;
        let outlets = pair_outlets(coords, points)?;
        info!("{} labelled outlets", outlets.len());

        let store = ArtifactStore::create(&self.config.scratch_dir, &self.config.output_dir)?;
        let mut artifacts = vec![store.write_config(&self.config)?];

        let surface = ElevationSurface::open(&inputs.dem)?;
        let (rows, cols) = surface.shape();
        info!("Elevation surface {} x {}", cols, rows);

        let routing = route_flow(surface.raster(), self.config.routing.params())?;
        artifacts.push(store.write_direction(&routing.direction)?);

        let workers = self
            .config
            .workers
            .unwrap_or_else(num_cpus)
            .min(max_basin_workers(rows, cols, self.config.routing.memory_mb));
        let mode = ProcessingMode::bounded(workers);
        debug!("{} basin workers ({:?})", workers, mode);

        let delineator = RasterDelineator::new(&surface, &routing, self.config.snap_radius)
            .with_mask_store(self.config.keep_masks.then_some(&store));
        let zonal = RasterZonal::new(surface.raster(), mode);

        let stages = Stages {
            delineator: &delineator,
            zonal: &zonal,
            overlay: &GeoOverlay,
            store: &store,
            mode,
        };
        execute(outlets, &stages, artifacts)
    }
}

/// Pair inputs and run every stage over caller-supplied services.
///
/// Pairing happens first, so a label count mismatch never reaches the
/// delineator.
pub fn run_with<D, Z, O>(
    coords: Vec<(f64, f64)>,
    points: Vec<CollectionPoint>,
    stages: &Stages<'_, D, Z, O>,
) -> Result<RunReport>
where
    D: BasinDelineator + ?Sized,
    Z: ZonalMinimum + ?Sized,
    O: Overlay + ?Sized,
{
    let outlets = pair_outlets(coords, points)?;
    execute(outlets, stages, Vec::new())
}

fn delineate_all<D: BasinDelineator + ?Sized>(
    delineator: &D,
    outlets: &[OutletPoint],
    mode: ProcessingMode,
) -> Result<(Vec<BasinPolygon>, Vec<StageFailure>)> {
    let results = mode.par_map(0..outlets.len(), |i| delineator.delineate(&outlets[i]));

    let mut basins = Vec::with_capacity(outlets.len());
    let mut failures = Vec::new();
    for (outlet, result) in outlets.iter().zip(results) {
        match result {
            Ok(basin) => basins.push(basin),
            Err(e) => {
                warn!("{}: {}", outlet.label, e);
                failures.push(StageFailure::new(outlet.label.as_str(), Stage::Delineation, e));
            }
        }
    }

    check_accounting(Stage::Delineation, outlets.len(), basins.len(), failures.len())?;
    Ok((basins, failures))
}

fn execute<D, Z, O>(
    outlets: Vec<OutletPoint>,
    stages: &Stages<'_, D, Z, O>,
    mut artifacts: Vec<ArtifactRef>,
) -> Result<RunReport>
where
    D: BasinDelineator + ?Sized,
    Z: ZonalMinimum + ?Sized,
    O: Overlay + ?Sized,
{
    let store = stages.store;
    let mut report = RunReport {
        submitted: outlets.len(),
        ..Default::default()
    };

    let (basins, failures) = delineate_all(stages.delineator, &outlets, stages.mode)?;
    info!("Delineated {} of {} basins", basins.len(), outlets.len());
    report.delineated = basins.len();
    report.failures.extend(failures);
    for basin in &basins {
        artifacts.push(store.write_basin(basin)?);
    }

    let ranked = rank_basins(stages.zonal, basins)?;
    report.ranked = ranked.ranking.len();
    report.failures.extend(ranked.failures);
    for basin in ranked.ranking.iter() {
        if let Some(stats) = ranked.statistics.get(&basin.label) {
            artifacts.push(store.write_zonal_basin(basin, stats)?);
        }
    }
    info!("Ranked {} basins: {}", ranked.ranking.len(), ranked.ranking.labels().join(" > "));

    let outcome = hierarchical_difference(stages.overlay, &ranked.ranking, stages.mode)?;
    report.exclusive = outcome.areas.len();
    report.failures.extend(outcome.failures);

    for area in &outcome.areas {
        artifacts.push(store.write_exclusive_area(area)?);
        if let Some(basin) = ranked.ranking.iter().find(|b| b.label == area.label) {
            report.results.push(LabelResult::new(area, basin));
        }
        if area.is_empty() {
            info!("{}: fully covered by upstream basins", area.label);
        }
    }
    artifacts.push(store.write_exclusive_areas(&outcome.areas)?);

    // The summary lists itself
    artifacts.push(ArtifactRef {
        kind: ArtifactKind::RunSummary,
        label: None,
        path: store.summary_path(),
    });
    report.artifacts = artifacts;
    store.write_summary(&report)?;

    if report.failures.is_empty() {
        info!("{} exclusive areas written to {}", report.exclusive, store.output_dir().display());
    } else {
        warn!(
            "{} exclusive areas written, {} labels failed",
            report.exclusive,
            report.failures.len()
        );
    }
    Ok(report)
}
