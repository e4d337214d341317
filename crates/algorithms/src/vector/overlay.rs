//! Polygon overlay: difference, union, intersection area

use crate::vector::spatial::bounding_box;
use geo::{Area, BooleanOps, CoordsIter, MultiPolygon};
use nestshed_core::{Error, Result};

fn all_finite(geom: &MultiPolygon<f64>) -> bool {
    geom.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite())
}

/// Area of `subject` not covered by `clip`.
///
/// When the bounding boxes do not intersect the subject is returned
/// unchanged without running the boolean operation. Fails when either input
/// or the result carries a non-finite coordinate.
pub fn difference(subject: &MultiPolygon<f64>, clip: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
    if !all_finite(subject) || !all_finite(clip) {
        return Err(Error::Algorithm("overlay input has non-finite coordinates".into()));
    }

    let (Some(a), Some(b)) = (bounding_box(subject), bounding_box(clip)) else {
        return Ok(subject.clone());
    };
    if !a.intersects(&b) {
        return Ok(subject.clone());
    }

    let result = subject.difference(clip);
    if !all_finite(&result) {
        return Err(Error::Algorithm("overlay produced non-finite coordinates".into()));
    }
    Ok(result)
}

/// Union of all geometries
pub fn union_all<'a>(geoms: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> MultiPolygon<f64> {
    geoms
        .into_iter()
        .fold(MultiPolygon::new(vec![]), |acc, g| acc.union(g))
}

/// Area shared by two geometries
pub fn intersection_area(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> f64 {
    match (bounding_box(a), bounding_box(b)) {
        (Some(ba), Some(bb)) if ba.intersects(&bb) => a.intersection(b).unsigned_area(),
        _ => 0.0,
    }
}
