//! Hydrological analysis algorithms
//!
//! - Priority-Flood: O(n log n) depression filling (Barnes 2014)
//! - Flow direction: D8 single flow direction
//! - Flow accumulation: MFD contributing area with a convergence factor
//! - Stream network: threshold on accumulation
//! - Snap: move an outlet onto the nearest strong channel cell
//! - Watershed: basin draining to one outlet cell
//! - Routing: the whole chain under a memory ceiling

pub mod d8;
mod flow_accumulation;
mod flow_direction;
mod priority_flood;
mod routing;
mod snap;
mod stream_network;
mod watershed;

pub use flow_accumulation::{flow_accumulation, FlowAccumulation, MfdParams};
pub use flow_direction::{flow_direction, FlowDirection};
pub use priority_flood::{priority_flood, PriorityFlood, PriorityFloodParams};
pub use routing::{max_basin_workers, route_flow, routing_memory_mb, FlowRouting, FlowRoutingParams};
pub use snap::snap_outlet;
pub use stream_network::{stream_network, StreamNetworkParams};
pub use watershed::{outlet_basin, OutletBasin, Watershed};
