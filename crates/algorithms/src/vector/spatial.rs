//! Spatial operations: bounding box, dissolve

use geo::{BooleanOps, BoundingRect, MultiPolygon, Polygon};
use std::collections::BTreeMap;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Closed-interval test: boxes sharing only an edge intersect
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }
}

/// Bounding box of a multi-polygon, `None` when it is empty
pub fn bounding_box(geom: &MultiPolygon<f64>) -> Option<BoundingBox> {
    geom.bounding_rect().map(|rect| BoundingBox {
        min_x: rect.min().x,
        min_y: rect.min().y,
        max_x: rect.max().x,
        max_y: rect.max().y,
    })
}

/// Dissolve: merge the polygons of each zone into one multi-polygon.
///
/// Parts are unioned, so shared edges disappear and overlaps count once.
/// Zones come back in ascending id order.
pub fn dissolve(features: &[(i64, Polygon<f64>)]) -> BTreeMap<i64, MultiPolygon<f64>> {
    let mut groups: BTreeMap<i64, Vec<Polygon<f64>>> = BTreeMap::new();

    for (zone, poly) in features {
        groups.entry(*zone).or_default().push(poly.clone());
    }

    groups
        .into_iter()
        .map(|(zone, polys)| {
            let merged = polys
                .into_iter()
                .fold(MultiPolygon::new(vec![]), |acc, poly| acc.union(&poly));
            (zone, merged)
        })
        .collect()
}
