//! Records passed between pipeline stages

use geo::MultiPolygon;
use nestshed_algorithms::vector::{area, perimeter};

/// A labelled outlet in the elevation surface's coordinate frame
#[derive(Debug, Clone, PartialEq)]
pub struct OutletPoint {
    pub label: String,
    /// Position in the outlet list
    pub index: usize,
    pub x: f64,
    pub y: f64,
}

/// A collection-point label, paired with an outlet by position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPoint {
    pub label: String,
}

impl CollectionPoint {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

/// The delineated basin of one outlet
#[derive(Debug, Clone, PartialEq)]
pub struct BasinPolygon {
    pub label: String,
    /// Position of the outlet in the input list; breaks elevation ties
    pub input_index: usize,
    pub geometry: MultiPolygon<f64>,
    pub cell_count: usize,
    /// Outlet cell (row, col) after snapping
    pub outlet_cell: (usize, usize),
    /// Minimum elevation inside the basin, set by the ranker
    pub outlet_elevation: Option<f64>,
}

impl BasinPolygon {
    /// Copy of this basin carrying its minimum elevation
    pub fn with_elevation(&self, elevation: f64) -> Self {
        Self {
            outlet_elevation: Some(elevation),
            ..self.clone()
        }
    }
}

/// Part of a basin not drained by any basin ranked before it
#[derive(Debug, Clone, PartialEq)]
pub struct ExclusiveAreaPolygon {
    pub label: String,
    pub rank: usize,
    pub elevation: f64,
    pub geometry: MultiPolygon<f64>,
    pub area: f64,
    pub perimeter: f64,
}

impl ExclusiveAreaPolygon {
    /// Build the record, normalising zero-area geometry to an empty one
    pub fn new(label: impl Into<String>, rank: usize, elevation: f64, geometry: MultiPolygon<f64>) -> Self {
        let area = area(&geometry);
        let geometry = if area > 0.0 { geometry } else { MultiPolygon::new(vec![]) };
        let perimeter = perimeter(&geometry);
        Self {
            label: label.into(),
            rank,
            elevation,
            geometry,
            area,
            perimeter,
        }
    }

    /// True when predecessors cover the whole basin
    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon};

    #[test]
    fn test_exclusive_area_measures() {
        let square = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)]),
            vec![],
        );
        let record = ExclusiveAreaPolygon::new("A", 0, 10.0, MultiPolygon::new(vec![square]));
        assert_eq!(record.area, 4.0);
        assert_eq!(record.perimeter, 8.0);
        assert!(!record.is_empty());
    }

    #[test]
    fn test_zero_area_is_empty() {
        let sliver = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 0.0)]),
            vec![],
        );
        let record = ExclusiveAreaPolygon::new("A", 1, 10.0, MultiPolygon::new(vec![sliver]));
        assert!(record.is_empty());
        assert_eq!(record.area, 0.0);
        assert_eq!(record.perimeter, 0.0);
    }

    #[test]
    fn test_with_elevation_keeps_geometry() {
        let basin = BasinPolygon {
            label: "A".into(),
            input_index: 3,
            geometry: MultiPolygon::new(vec![]),
            cell_count: 0,
            outlet_cell: (1, 2),
            outlet_elevation: None,
        };
        let ranked = basin.with_elevation(42.0);
        assert_eq!(ranked.outlet_elevation, Some(42.0));
        assert_eq!(ranked.input_index, 3);
        assert_eq!(basin.outlet_elevation, None);
    }
}
