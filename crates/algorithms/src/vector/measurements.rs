//! Geometric measurements: area, perimeter

use geo::{Area as GeoArea, Euclidean, Length, MultiPolygon, Polygon};

/// Unsigned area in map units squared
pub fn area(geom: &MultiPolygon<f64>) -> f64 {
    geom.unsigned_area()
}

fn polygon_perimeter(p: &Polygon<f64>) -> f64 {
    let ext = p.exterior().length::<Euclidean>();
    let int: f64 = p.interiors().iter().map(|r| r.length::<Euclidean>()).sum();
    ext + int
}

/// Total length of exterior and interior rings
pub fn perimeter(geom: &MultiPolygon<f64>) -> f64 {
    geom.0.iter().map(polygon_perimeter).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;

    fn square() -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0),
            ]),
            vec![],
        )
    }

    #[test]
    fn test_area_square() {
        let a = area(&MultiPolygon::new(vec![square()]));
        assert!((a - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_empty_geometry_measures_zero() {
        let empty = MultiPolygon::new(vec![]);
        assert_eq!(area(&empty), 0.0);
        assert_eq!(perimeter(&empty), 0.0);
    }

    #[test]
    fn test_perimeter_with_hole() {
        let poly = Polygon::new(
            LineString::from(vec![
                (0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0),
            ]),
            vec![LineString::from(vec![
                (2.0, 2.0), (8.0, 2.0), (8.0, 8.0), (2.0, 8.0), (2.0, 2.0),
            ])],
        );
        let p = perimeter(&MultiPolygon::new(vec![poly, square()]));
        // 40 + 24 for the holed square, 40 for the plain one
        assert!((p - 104.0).abs() < 1e-10);
    }
}
