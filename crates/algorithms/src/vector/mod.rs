//! Vector analysis algorithms
//!
//! Geometric operations on basin polygons:
//! - Polygonize: raster zones to polygons
//! - Repair: topologically valid equivalents
//! - Dissolve: merge polygons per zone
//! - Overlay: difference, union, intersection area
//! - Area / Perimeter: geometric measurements

mod measurements;
mod overlay;
mod polygonize;
mod repair;
mod spatial;

pub use measurements::{area, perimeter};
pub use overlay::{difference, intersection_area, union_all};
pub use polygonize::polygonize;
pub use repair::{repair_multi_polygon, repair_polygon};
pub use spatial::{bounding_box, dissolve, BoundingBox};
