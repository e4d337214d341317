//! Persisted artifacts
//!
//! Intermediate products go to the scratch directory, exclusive areas and
//! the run summary to the output directory. Every write returns an
//! [`ArtifactRef`] so later stages never rediscover files by scanning.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::input::sanitize_label;
use crate::model::{BasinPolygon, ExclusiveAreaPolygon};
use crate::report::RunReport;
use geo::Geometry;
use nestshed_algorithms::statistics::ZonalResult;
use nestshed_core::io::{write_feature_collection, write_geotiff, GeoTiffOptions};
use nestshed_core::vector::{Feature, FeatureCollection};
use nestshed_core::Raster;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// What an artifact holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    DrainageDirection,
    BasinMask,
    Basin,
    ZonalBasin,
    RunConfig,
    ExclusiveArea,
    ExclusiveAreas,
    RunSummary,
}

/// A written artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRef {
    pub kind: ArtifactKind,
    pub label: Option<String>,
    pub path: PathBuf,
}

/// Scratch and output directories of one run
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    scratch: PathBuf,
    output: PathBuf,
}

fn exclusive_feature(area: &ExclusiveAreaPolygon) -> Feature {
    let mut feature = Feature::new(Geometry::MultiPolygon(area.geometry.clone()))
        .with_property("label", area.label.as_str())
        .with_property("rank", area.rank)
        .with_property("_min", area.elevation)
        .with_property("area", area.area)
        .with_property("perimeter", area.perimeter)
        .with_property("empty", area.is_empty());
    feature.id = Some(area.label.clone());
    feature
}

impl ArtifactStore {
    /// Create both directories. They must not be the same place.
    pub fn create<P: AsRef<Path>, Q: AsRef<Path>>(scratch: P, output: Q) -> Result<Self> {
        let scratch = scratch.as_ref().to_path_buf();
        let output = output.as_ref().to_path_buf();
        fs::create_dir_all(&scratch)?;
        fs::create_dir_all(&output)?;
        if scratch.canonicalize()? == output.canonicalize()? {
            return Err(PipelineError::InvalidConfig(format!(
                "scratch and output directories must differ ({})",
                output.display()
            )));
        }
        Ok(Self { scratch, output })
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch
    }

    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    fn scratch_file(&self, name: String) -> PathBuf {
        self.scratch.join(name)
    }

    fn output_file(&self, name: String) -> PathBuf {
        self.output.join(name)
    }

    /// Effective configuration of the run
    pub fn write_config(&self, config: &PipelineConfig) -> Result<ArtifactRef> {
        let path = self.scratch_file("run_config.json".into());
        fs::write(&path, serde_json::to_string_pretty(config)?)?;
        Ok(ArtifactRef { kind: ArtifactKind::RunConfig, label: None, path })
    }

    /// D8 drainage direction grid
    pub fn write_direction(&self, direction: &Raster<u8>) -> Result<ArtifactRef> {
        let path = self.scratch_file("drainage_direction.tif".into());
        write_geotiff(direction, &path, Some(GeoTiffOptions { write_nodata: true }))?;
        Ok(ArtifactRef { kind: ArtifactKind::DrainageDirection, label: None, path })
    }

    /// Contributing-cell mask of one basin
    pub fn write_basin_mask(&self, label: &str, mask: &Raster<u8>) -> Result<ArtifactRef> {
        let path = self.scratch_file(format!("basin_{}.tif", sanitize_label(label)));
        write_geotiff(mask, &path, Some(GeoTiffOptions { write_nodata: true }))?;
        Ok(ArtifactRef {
            kind: ArtifactKind::BasinMask,
            label: Some(label.to_string()),
            path,
        })
    }

    /// Delineated basin polygon
    pub fn write_basin(&self, basin: &BasinPolygon) -> Result<ArtifactRef> {
        let path = self.scratch_file(format!("basin_{}.geojson", sanitize_label(&basin.label)));
        let feature = Feature::new(Geometry::MultiPolygon(basin.geometry.clone()))
            .with_property("label", basin.label.as_str())
            .with_property("DN", 1usize)
            .with_property("cells", basin.cell_count)
            .with_property("outlet_row", basin.outlet_cell.0)
            .with_property("outlet_col", basin.outlet_cell.1);
        write_feature_collection(&FeatureCollection::from_iter([feature]), &path)?;
        Ok(ArtifactRef {
            kind: ArtifactKind::Basin,
            label: Some(basin.label.clone()),
            path,
        })
    }

    /// Basin polygon with its zonal elevation statistics
    pub fn write_zonal_basin(&self, basin: &BasinPolygon, stats: &ZonalResult) -> Result<ArtifactRef> {
        let path = self.scratch_file(format!("zonal_basin_{}.geojson", sanitize_label(&basin.label)));
        let feature = Feature::new(Geometry::MultiPolygon(basin.geometry.clone()))
            .with_property("label", basin.label.as_str())
            .with_property("_min", stats.min)
            .with_property("count", stats.count)
            .with_property("mean", stats.mean)
            .with_property("max", stats.max);
        write_feature_collection(&FeatureCollection::from_iter([feature]), &path)?;
        Ok(ArtifactRef {
            kind: ArtifactKind::ZonalBasin,
            label: Some(basin.label.clone()),
            path,
        })
    }

    /// One exclusive area, written even when empty
    pub fn write_exclusive_area(&self, area: &ExclusiveAreaPolygon) -> Result<ArtifactRef> {
        let path = self.output_file(format!(
            "exclusive_contribution_area_{}.geojson",
            sanitize_label(&area.label)
        ));
        write_feature_collection(&FeatureCollection::from_iter([exclusive_feature(area)]), &path)?;
        Ok(ArtifactRef {
            kind: ArtifactKind::ExclusiveArea,
            label: Some(area.label.clone()),
            path,
        })
    }

    /// All exclusive areas in rank order
    pub fn write_exclusive_areas(&self, areas: &[ExclusiveAreaPolygon]) -> Result<ArtifactRef> {
        let path = self.output_file("exclusive_contribution_areas.geojson".into());
        let collection: FeatureCollection = areas.iter().map(exclusive_feature).collect();
        write_feature_collection(&collection, &path)?;
        Ok(ArtifactRef { kind: ArtifactKind::ExclusiveAreas, label: None, path })
    }

    /// Path the run summary is written to
    pub fn summary_path(&self) -> PathBuf {
        self.output_file("run_summary.json".into())
    }

    /// Per-label results and failures
    pub fn write_summary(&self, report: &RunReport) -> Result<ArtifactRef> {
        let path = self.summary_path();
        fs::write(&path, serde_json::to_string_pretty(report)?)?;
        Ok(ArtifactRef { kind: ArtifactKind::RunSummary, label: None, path })
    }
}
