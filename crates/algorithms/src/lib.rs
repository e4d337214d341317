//! # nestshed algorithms
//!
//! Geoprocessing services behind the nestshed pipeline.
//!
//! ## Available Algorithm Categories
//!
//! - **hydrology**: Depression filling, flow direction, flow accumulation,
//!   stream extraction, outlet snapping, basin extraction
//! - **vector**: Polygonize, repair, dissolve, overlay, measurements
//! - **statistics**: Zonal statistics over polygons

pub mod hydrology;
pub(crate) mod maybe_rayon;
pub mod statistics;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::hydrology::{
        flow_accumulation, flow_direction, outlet_basin, priority_flood, route_flow,
        snap_outlet, stream_network, FlowAccumulation, FlowDirection, FlowRouting,
        FlowRoutingParams, OutletBasin, PriorityFlood, Watershed,
    };
    pub use crate::statistics::{polygon_statistics, ZonalResult};
    pub use crate::vector::{
        area, difference, dissolve, perimeter, polygonize, repair_multi_polygon, repair_polygon,
    };
    pub use nestshed_core::prelude::*;
}
