//! Statistical analysis algorithms for raster data
//!
//! - **zonal**: Statistics of the cells inside a polygon

pub mod zonal;

pub use zonal::{polygon_statistics, ZonalResult};
