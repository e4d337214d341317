//! Watershed delineator
//!
//! Turns one labelled outlet into one basin polygon: cell lookup, optional
//! snapping, upstream tracing, polygonize, repair, dissolve.

use crate::artifacts::ArtifactStore;
use crate::model::{BasinPolygon, OutletPoint};
use crate::surface::ElevationSurface;
use geo::{MultiPolygon, Polygon};
use nestshed_algorithms::hydrology::{outlet_basin, snap_outlet, FlowRouting, OutletBasin};
use nestshed_algorithms::vector::{dissolve, polygonize, repair_polygon};
use thiserror::Error;
use tracing::debug;

/// Why one outlet produced no basin
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DelineationError {
    #[error("outlet ({x}, {y}) is outside the elevation surface extent")]
    OutsideExtent { x: f64, y: f64 },

    #[error("no contributing cells at outlet cell ({row}, {col})")]
    NoContributingCells { row: usize, col: usize },

    #[error("basin polygon is empty after repair")]
    EmptyBasin,

    #[error("could not persist basin mask: {0}")]
    Persist(String),

    #[error("{0}")]
    Engine(String),
}

/// Produces the basin of one outlet
pub trait BasinDelineator: Sync {
    fn delineate(&self, outlet: &OutletPoint) -> Result<BasinPolygon, DelineationError>;
}

/// Delineator over a routed elevation surface
pub struct RasterDelineator<'a> {
    surface: &'a ElevationSurface,
    routing: &'a FlowRouting,
    snap_radius: usize,
    mask_store: Option<&'a ArtifactStore>,
}

impl<'a> RasterDelineator<'a> {
    pub fn new(surface: &'a ElevationSurface, routing: &'a FlowRouting, snap_radius: usize) -> Self {
        Self {
            surface,
            routing,
            snap_radius,
            mask_store: None,
        }
    }

    /// Persist each basin mask to `store`
    pub fn with_mask_store(mut self, store: Option<&'a ArtifactStore>) -> Self {
        self.mask_store = store;
        self
    }
}

fn engine(e: nestshed_core::Error) -> DelineationError {
    DelineationError::Engine(e.to_string())
}

/// Polygonize a mask, repair the parts and dissolve them into one geometry
pub fn mask_geometry(mask: &nestshed_core::Raster<u8>) -> nestshed_core::Result<MultiPolygon<f64>> {
    let parts: Vec<(i64, Polygon<f64>)> = polygonize(mask)?
        .iter()
        .flat_map(|(zone, poly)| repair_polygon(poly).0.into_iter().map(move |p| (*zone, p)))
        .collect();

    Ok(dissolve(&parts)
        .into_values()
        .fold(MultiPolygon::new(vec![]), |mut acc, geom| {
            acc.0.extend(geom.0);
            acc
        }))
}

impl BasinDelineator for RasterDelineator<'_> {
    fn delineate(&self, outlet: &OutletPoint) -> Result<BasinPolygon, DelineationError> {
        let cell = self
            .surface
            .cell_at(outlet.x, outlet.y)
            .ok_or(DelineationError::OutsideExtent { x: outlet.x, y: outlet.y })?;

        let cell = snap_outlet(&self.routing.accumulation, &self.routing.streams, cell, self.snap_radius)
            .map_err(engine)?;

        let (mask, count) = match outlet_basin(&self.routing.direction, cell).map_err(engine)? {
            OutletBasin::Cells { mask, count } => (mask, count),
            OutletBasin::NoContributingCells => {
                return Err(DelineationError::NoContributingCells { row: cell.0, col: cell.1 })
            }
        };
        debug!("{}: {} contributing cells at ({}, {})", outlet.label, count, cell.0, cell.1);

        if let Some(store) = self.mask_store {
            store
                .write_basin_mask(&outlet.label, &mask)
                .map_err(|e| DelineationError::Persist(e.to_string()))?;
        }

        let geometry = mask_geometry(&mask).map_err(engine)?;
        if geometry.0.is_empty() {
            return Err(DelineationError::EmptyBasin);
        }

        Ok(BasinPolygon {
            label: outlet.label.clone(),
            input_index: outlet.index,
            geometry,
            cell_count: count,
            outlet_cell: cell,
            outlet_elevation: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::Area;
    use nestshed_algorithms::hydrology::{route_flow, FlowRoutingParams};
    use nestshed_core::{GeoTransform, Raster};

    fn valley() -> ElevationSurface {
        let mut dem = Raster::new(10, 7);
        dem.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));
        for row in 0..10 {
            for col in 0..7 {
                let z = 100.0 + (9 - row) as f64 + 2.0 * (col as f64 - 3.0).abs();
                dem.set(row, col, z).unwrap();
            }
        }
        ElevationSurface::from_raster(dem).unwrap()
    }

    fn routed(surface: &ElevationSurface) -> FlowRouting {
        route_flow(surface.raster(), FlowRoutingParams { threshold: 5.0, ..Default::default() }).unwrap()
    }

    fn outlet(label: &str, x: f64, y: f64) -> OutletPoint {
        OutletPoint { label: label.into(), index: 0, x, y }
    }

    #[test]
    fn test_basin_area_matches_cell_count() {
        let surface = valley();
        let routing = routed(&surface);
        let delineator = RasterDelineator::new(&surface, &routing, 0);

        // Cell (4, 3)
        let basin = delineator.delineate(&outlet("mid", 3.5, 5.5)).unwrap();
        assert_eq!(basin.outlet_cell, (4, 3));
        assert_relative_eq!(basin.geometry.unsigned_area(), basin.cell_count as f64, epsilon = 1e-9);
        assert!(basin.outlet_elevation.is_none());
    }

    #[test]
    fn test_outside_extent_is_label_failure() {
        let surface = valley();
        let routing = routed(&surface);
        let delineator = RasterDelineator::new(&surface, &routing, 0);
        let err = delineator.delineate(&outlet("far", 50.0, 5.0)).unwrap_err();
        assert!(matches!(err, DelineationError::OutsideExtent { .. }));
    }

    #[test]
    fn test_snapping_moves_outlet_onto_channel() {
        let surface = valley();
        let routing = routed(&surface);
        let delineator = RasterDelineator::new(&surface, &routing, 1);

        // Cell (8, 2) sits beside the channel in column 3
        let basin = delineator.delineate(&outlet("side", 2.5, 1.5)).unwrap();
        assert_eq!(basin.outlet_cell.1, 3);
    }

    #[test]
    fn test_mask_is_persisted_when_requested() {
        let surface = valley();
        let routing = routed(&surface);
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::create(dir.path().join("s"), dir.path().join("o")).unwrap();
        let delineator = RasterDelineator::new(&surface, &routing, 0).with_mask_store(Some(&store));

        delineator.delineate(&outlet("m/1", 3.5, 5.5)).unwrap();
        assert!(dir.path().join("s").join("basin_m_1.tif").exists());
    }
}
