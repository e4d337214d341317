//! Geometry repair
//!
//! Produces a topologically valid equivalent of a polygon: repeated and
//! non-finite vertices removed, degenerate rings dropped, orientation
//! normalised and self-overlaps resolved by a self-union.

use geo::orient::{Direction, Orient};
use geo::{Area, BooleanOps, LineString, MultiPolygon, Polygon, RemoveRepeatedPoints};

/// A closed ring needs at least three distinct vertices plus the closing one
const MIN_RING_COORDS: usize = 4;

fn clean_ring(ring: &LineString<f64>) -> Option<LineString<f64>> {
    let mut coords: Vec<_> = ring.0.iter().copied().filter(|c| c.x.is_finite() && c.y.is_finite()).collect();
    if coords.first() != coords.last() {
        if let Some(&first) = coords.first() {
            coords.push(first);
        }
    }
    let cleaned = LineString::from(coords).remove_repeated_points();
    if cleaned.0.len() < MIN_RING_COORDS {
        return None;
    }
    let shell = Polygon::new(cleaned.clone(), vec![]);
    (shell.unsigned_area() > 0.0).then_some(cleaned)
}

/// Repair one polygon. A polygon whose exterior is degenerate repairs to an
/// empty multi-polygon.
pub fn repair_polygon(polygon: &Polygon<f64>) -> MultiPolygon<f64> {
    let Some(exterior) = clean_ring(polygon.exterior()) else {
        return MultiPolygon::new(vec![]);
    };
    let interiors = polygon.interiors().iter().filter_map(clean_ring).collect();
    let cleaned = Polygon::new(exterior, interiors).orient(Direction::Default);

    cleaned.union(&MultiPolygon::new(vec![]))
}

/// Repair every part of a multi-polygon and merge overlapping parts
pub fn repair_multi_polygon(multi: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    let parts: Vec<Polygon<f64>> = multi
        .0
        .iter()
        .flat_map(|p| repair_polygon(p).0)
        .collect();
    if parts.len() <= 1 {
        return MultiPolygon::new(parts);
    }
    MultiPolygon::new(parts).union(&MultiPolygon::new(vec![]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_repair_keeps_valid_polygon() {
        let square = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)]),
            vec![],
        );
        let repaired = repair_polygon(&square);
        assert_eq!(repaired.0.len(), 1);
        assert_relative_eq!(repaired.unsigned_area(), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_repair_removes_repeated_points_and_closes() {
        let ring = LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let repaired = repair_polygon(&Polygon::new(ring, vec![]));
        assert_relative_eq!(repaired.unsigned_area(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_repair_drops_degenerate_polygon() {
        let flat = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 0.0)]),
            vec![],
        );
        assert!(repair_polygon(&flat).0.is_empty());
    }

    #[test]
    fn test_repair_drops_degenerate_hole() {
        let poly = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)]),
            vec![LineString::from(vec![(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)])],
        );
        let repaired = repair_polygon(&poly);
        assert_relative_eq!(repaired.unsigned_area(), 16.0, epsilon = 1e-9);
    }

    #[test]
    fn test_repair_multi_merges_overlap() {
        let a = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)]),
            vec![],
        );
        let b = Polygon::new(
            LineString::from(vec![(1.0, 0.0), (3.0, 0.0), (3.0, 2.0), (1.0, 2.0), (1.0, 0.0)]),
            vec![],
        );
        let repaired = repair_multi_polygon(&MultiPolygon::new(vec![a, b]));
        assert_relative_eq!(repaired.unsigned_area(), 6.0, epsilon = 1e-9);
    }
}
