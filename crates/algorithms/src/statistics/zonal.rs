//! Zonal statistics over polygons
//!
//! Samples the cells of a value raster whose centres lie strictly inside a
//! polygon. No-data cells are skipped.

use crate::vector::bounding_box;
use geo::{Contains, MultiPolygon, Point};
use nestshed_core::raster::Raster;

/// Statistics of the valid cells inside one zone
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalResult {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Compute count, min, max and mean of `values` inside `zone`.
///
/// Returns `None` when no valid cell centre lies inside the polygon. Only
/// the cells under the polygon's bounding box are visited.
pub fn polygon_statistics(values: &Raster<f64>, zone: &MultiPolygon<f64>) -> Option<ZonalResult> {
    let bbox = bounding_box(zone)?;
    let (rows, cols) = values.shape();
    if rows == 0 || cols == 0 {
        return None;
    }

    let transform = values.transform();
    let (c0, r0) = transform.geo_to_pixel(bbox.min_x, bbox.min_y);
    let (c1, r1) = transform.geo_to_pixel(bbox.max_x, bbox.max_y);

    let clamp = |v: f64, n: usize| -> usize {
        if v.is_nan() || v <= 0.0 {
            0
        } else {
            (v as usize).min(n - 1)
        }
    };
    let (row_start, row_end) = (clamp(r0.min(r1).floor(), rows), clamp(r0.max(r1).ceil(), rows));
    let (col_start, col_end) = (clamp(c0.min(c1).floor(), cols), clamp(c0.max(c1).ceil(), cols));

    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for row in row_start..=row_end {
        for col in col_start..=col_end {
            let val = unsafe { values.get_unchecked(row, col) };
            if values.is_nodata(val) {
                continue;
            }
            let (x, y) = transform.pixel_to_geo(col, row);
            if !zone.contains(&Point::new(x, y)) {
                continue;
            }

            count += 1;
            sum += val;
            min = min.min(val);
            max = max.max(val);
        }
    }

    (count > 0).then(|| ZonalResult {
        count,
        min,
        max,
        mean: sum / count as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{LineString, Polygon};
    use nestshed_core::GeoTransform;

    fn ramp() -> Raster<f64> {
        // 4x4, value = row * 4 + col, cell (r, c) centred at (c + 0.5, 3.5 - r)
        let mut raster = Raster::new(4, 4);
        raster.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        for row in 0..4 {
            for col in 0..4 {
                raster.set(row, col, (row * 4 + col) as f64).unwrap();
            }
        }
        raster
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            vec![],
        )])
    }

    #[test]
    fn test_statistics_inside_rectangle() {
        // Bottom-right 2x2 block: rows 2..3, cols 2..3
        let stats = polygon_statistics(&ramp(), &rect(2.0, 0.0, 4.0, 2.0)).unwrap();
        assert_eq!(stats.count, 4);
        assert_relative_eq!(stats.min, 10.0);
        assert_relative_eq!(stats.max, 15.0);
        assert_relative_eq!(stats.mean, 12.5);
    }

    #[test]
    fn test_statistics_skip_nodata() {
        let mut raster = ramp();
        raster.set_nodata(Some(-9999.0));
        raster.set(2, 2, -9999.0).unwrap();
        let stats = polygon_statistics(&raster, &rect(2.0, 0.0, 4.0, 2.0)).unwrap();
        assert_eq!(stats.count, 3);
        assert_relative_eq!(stats.min, 11.0);
    }

    #[test]
    fn test_statistics_no_centre_inside() {
        // Thin sliver between cell centres
        assert!(polygon_statistics(&ramp(), &rect(0.6, 0.0, 0.9, 4.0)).is_none());
        assert!(polygon_statistics(&ramp(), &MultiPolygon::new(vec![])).is_none());
    }

    #[test]
    fn test_statistics_outside_raster() {
        assert!(polygon_statistics(&ramp(), &rect(10.0, 10.0, 12.0, 12.0)).is_none());
    }
}
