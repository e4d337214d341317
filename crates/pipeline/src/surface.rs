//! Elevation surface provider

use crate::error::{PipelineError, Result};
use nestshed_core::io::read_geotiff;
use nestshed_core::Raster;
use std::path::Path;

/// A single-band elevation raster with at least one valid cell
#[derive(Debug, Clone)]
pub struct ElevationSurface {
    raster: Raster<f64>,
}

impl ElevationSurface {
    /// Load a GeoTIFF elevation model
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_raster(read_geotiff::<f64, _>(path)?)
    }

    pub fn from_raster(raster: Raster<f64>) -> Result<Self> {
        if raster.statistics().valid_count == 0 {
            return Err(PipelineError::EmptySurface);
        }
        Ok(Self { raster })
    }

    pub fn raster(&self) -> &Raster<f64> {
        &self.raster
    }

    pub fn shape(&self) -> (usize, usize) {
        self.raster.shape()
    }

    /// Cell containing (x, y), `None` outside the surface extent
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        self.raster.cell_at(x, y)
    }
}
